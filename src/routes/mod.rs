pub mod debug;
pub mod plan;
pub mod pois;
pub mod substitute;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/routes/search", post(plan::search_routes))
        .route("/routes/replace", post(substitute::replace_full_route))
        .route("/poi/replace", post(substitute::replace_poi))
        .route("/poi/confirm-replace", post(substitute::confirm_replace))
        .route("/poi/visited", post(pois::visited_pois))
        .route("/debug/health", get(debug::health_check))
        .with_state(state)
}
