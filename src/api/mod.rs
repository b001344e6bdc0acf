//! Read-only query API over the live pipeline
//!
//! This is the surface a map UI polls for positions and fleet statistics.
//! Nothing here mutates pipeline state.
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Actor handles** for querying the aggregator, entity actors and ingest loop
//! - **WebSocket** for streaming fleet events
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/satellites` - Every known entity summary
//! - `GET /api/v1/satellites/{id}` - Current state of one entity
//! - `GET /api/v1/satellites/{id}/tracks` - Ground track history of one entity
//! - `GET /api/v1/classes/{class}` - Members of a type bucket
//! - `GET /api/v1/stats/types` - Per-type counts
//! - `GET /api/v1/stats/countries` - Per-country counts
//! - `GET /api/v1/stats/pipeline` - Throughput and backlog statistics
//! - `WS /api/v1/stream` - Live fleet events

pub mod error;
pub mod routes;
pub mod state;
pub mod types;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{
    ClassResponse, HealthResponse, PipelineStatsResponse, RegistryStats, SatellitesResponse,
    TracksResponse,
};

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiSettings;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: SocketAddr,

    /// Enable CORS for browser clients
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 9002)),
            enable_cors: true,
        }
    }
}

impl From<&ApiSettings> for ApiConfig {
    fn from(settings: &ApiSettings) -> Self {
        Self {
            bind_addr: settings.bind,
            enable_cors: settings.enable_cors,
        }
    }
}

/// Build the API router
pub fn router(state: ApiState, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/satellites", get(routes::satellites::list_satellites))
        .route(
            "/api/v1/satellites/:id",
            get(routes::satellites::get_satellite),
        )
        .route(
            "/api/v1/satellites/:id/tracks",
            get(routes::satellites::get_tracks),
        )
        .route("/api/v1/classes/:class", get(routes::satellites::get_class))
        .route("/api/v1/stats/types", get(routes::stats::get_type_counts))
        .route(
            "/api/v1/stats/countries",
            get(routes::stats::get_country_counts),
        )
        .route("/api/v1/stats/pipeline", get(routes::stats::get_pipeline_stats))
        .route("/api/v1/stream", get(websocket::websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// Starts an Axum HTTP server in a background task and returns the bound
/// address (useful when binding port 0).
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(state, config.enable_cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
