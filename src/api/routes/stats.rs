//! Fleet and pipeline statistics endpoints

use axum::{Json, extract::State};

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{CountsResponse, PipelineStatsResponse, RegistryStats},
};

/// GET /api/v1/stats/types
///
/// Always contains all three buckets, keyed by class tag
pub async fn get_type_counts(State(state): State<ApiState>) -> ApiResult<Json<CountsResponse>> {
    let counts = state.aggregator.type_counts().await?;

    Ok(Json(
        counts
            .into_iter()
            .map(|(class, count)| (class.tag().to_string(), count))
            .collect(),
    ))
}

/// GET /api/v1/stats/countries
pub async fn get_country_counts(State(state): State<ApiState>) -> ApiResult<Json<CountsResponse>> {
    Ok(Json(state.aggregator.country_counts().await?))
}

/// GET /api/v1/stats/pipeline
///
/// Aggregator backlog, registry size and (when running) ingest counters
pub async fn get_pipeline_stats(
    State(state): State<ApiState>,
) -> ApiResult<Json<PipelineStatsResponse>> {
    let aggregator = state.aggregator.stats().await?;

    let ingest = match &state.ingest {
        Some(handle) => Some(handle.stats().await?),
        None => None,
    };

    Ok(Json(PipelineStatsResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        aggregator,
        registry: RegistryStats {
            live_actors: state.registry.len(),
            spawned_total: state.registry.spawned_total(),
        },
        ingest,
    }))
}
