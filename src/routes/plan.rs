use crate::error::{AppError, Result};
use crate::models::{SearchRoutesRequest, SearchRoutesResponse};
use crate::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// POST /routes/search
/// Plan up to `max_routes` tours for the given position, mode and interests.
pub async fn search_routes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRoutesRequest>,
) -> Result<Json<SearchRoutesResponse>> {
    request.validate().map_err(AppError::InvalidRequest)?;

    tracing::info!(
        lat = request.lat,
        lon = request.lon,
        mode = %request.mode,
        query = %request.query,
        budget_minutes = request.max_time_minutes,
        target_places = request.target_places,
        "Route search request"
    );

    let response = state.planner.search_routes(&request).await?;

    tracing::info!(
        routes = response.routes.len(),
        total_ms = response.timing_breakdown.total_ms,
        "Route search complete"
    );

    Ok(Json(response))
}
