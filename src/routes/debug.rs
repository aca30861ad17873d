use crate::cache::KvCache;
use crate::db::PoiRepository;
use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /debug/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let cell_cache_ok = state.cell_cache.health_check().await;
    let user_cache_ok = state.user_cache.health_check().await;
    let poi_count = state.poi_repo.count().await.ok();

    Json(json!({
        "status": if cell_cache_ok && user_cache_ok { "ok" } else { "degraded" },
        "cell_cache": {
            "backend": state.cell_cache.backend_name(),
            "healthy": cell_cache_ok,
        },
        "user_cache": {
            "backend": state.user_cache.backend_name(),
            "healthy": user_cache_ok,
        },
        "poi_count": poi_count,
    }))
}
