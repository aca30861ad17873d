// Library exports for testing and reusability

pub mod cache;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod geo;
pub mod models;
pub mod planner;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use cache::{CacheStats, KvCache};
pub use error::{AppError, Result};

use services::orchestrator::RoutePlanningService;
use services::substitution::SubstitutionService;
use std::sync::Arc;

// App state for sharing across the application
pub struct AppState {
    pub poi_repo: Arc<dyn db::PoiRepository>,
    pub planner: RoutePlanningService,
    pub substitution: SubstitutionService,
    pub cell_cache: Arc<dyn KvCache>,
    pub user_cache: Arc<dyn KvCache>,
}
