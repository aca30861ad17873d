use crate::error::Result;
use crate::models::VisitedPoisRequest;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct VisitedPoisResponse {
    pub poi_ids: Vec<String>,
}

/// POST /poi/visited
/// POI ids an external collaborator recorded as visited by this user.
pub async fn visited_pois(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VisitedPoisRequest>,
) -> Result<Json<VisitedPoisResponse>> {
    let poi_ids = state.planner.visited_pois(request.user_id).await?;
    Ok(Json(VisitedPoisResponse { poi_ids }))
}
