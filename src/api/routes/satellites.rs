//! Entity endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::trace;

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::{ClassResponse, SatellitesResponse, TracksResponse},
    },
    fleet::ObjectClass,
    tracking::EntityState,
};

/// GET /api/v1/satellites
///
/// Summaries of every entity the aggregator knows, sorted by catalog number
pub async fn list_satellites(State(state): State<ApiState>) -> ApiResult<Json<SatellitesResponse>> {
    let satellites = state.aggregator.entities().await?;

    Ok(Json(SatellitesResponse {
        count: satellites.len(),
        satellites,
    }))
}

/// GET /api/v1/satellites/:id
///
/// Current state of one entity, straight from its actor
pub async fn get_satellite(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<EntityState>> {
    Ok(Json(entity_state(&state, &id).await?))
}

/// GET /api/v1/satellites/:id/tracks
pub async fn get_tracks(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TracksResponse>> {
    let entity = entity_state(&state, &id).await?;

    Ok(Json(TracksResponse {
        catalog_number: entity.catalog_number,
        last_update: entity.last_update_millis,
        history: entity.history.into_iter().collect(),
    }))
}

/// GET /api/v1/classes/:class
///
/// Accepts the tag (`ROCKET_BODY`) as well as looser spellings (`rocket-body`)
pub async fn get_class(
    State(state): State<ApiState>,
    Path(class): Path<String>,
) -> ApiResult<Json<ClassResponse>> {
    let class: ObjectClass = class.parse().map_err(ApiError::NotFound)?;
    let members = state.aggregator.members(class).await?;

    Ok(Json(ClassResponse {
        class,
        display_name: class.display_name().to_string(),
        count: members.len(),
        members,
    }))
}

async fn entity_state(state: &ApiState, id: &str) -> ApiResult<EntityState> {
    trace!("looking up entity {id}");

    let handle = state
        .registry
        .get(id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown catalog number '{id}'")))?;

    Ok(handle.state().await?)
}
