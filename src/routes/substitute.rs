use crate::error::{AppError, Result};
use crate::models::{
    ConfirmReplaceRequest, ReplaceFullRouteRequest, ReplacePoiRequest, ReplacePoiResponse, Route,
};
use crate::services::user_routes::RoutePoiRef;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// POST /poi/replace
/// Rank same-category alternatives for one stop of a cached route.
pub async fn replace_poi(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReplacePoiRequest>,
) -> Result<Json<ReplacePoiResponse>> {
    request.validate().map_err(AppError::InvalidRequest)?;

    tracing::info!(
        user = %request.user_id,
        route = %request.route_id,
        old_poi = %request.old_poi_id,
        "Replacement candidates requested"
    );

    let candidates = state.substitution.replace_poi(&request).await?;
    Ok(Json(ReplacePoiResponse { candidates }))
}

#[derive(Serialize)]
pub struct ConfirmReplaceResponse {
    pub status: &'static str,
    pub updated_route: Vec<RoutePoiRef>,
}

/// POST /poi/confirm-replace
/// Commit a previously offered substitution into the cached route.
pub async fn confirm_replace(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConfirmReplaceRequest>,
) -> Result<Json<ConfirmReplaceResponse>> {
    tracing::info!(
        user = %request.user_id,
        route = %request.route_id,
        old_poi = %request.old_poi_id,
        new_poi = %request.new_poi_id,
        "Confirming POI replacement"
    );

    let updated_route = state.substitution.confirm_replace(&request).await?;
    Ok(Json(ConfirmReplaceResponse {
        status: "replaced",
        updated_route,
    }))
}

#[derive(Serialize)]
pub struct ReplaceFullRouteResponse {
    pub route: Route,
}

/// POST /routes/replace
/// Rebuild one cached route from a fresh query; other routes are untouched.
pub async fn replace_full_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReplaceFullRouteRequest>,
) -> Result<Json<ReplaceFullRouteResponse>> {
    request.validate().map_err(AppError::InvalidRequest)?;

    tracing::info!(
        user = %request.user_id,
        route = %request.route_id,
        query = %request.new_query,
        "Full route replacement requested"
    );

    let route = state.planner.replace_full_route(&request).await?;
    Ok(Json(ReplaceFullRouteResponse { route }))
}
