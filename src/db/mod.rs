use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

mod poi_queries;
pub mod poi_repository;

/// Re-export query functions under `queries` for direct use in tests
pub mod queries {
    pub use super::poi_queries::*;
}

pub use poi_repository::{PgPoiRepository, PoiRepository};

use crate::constants::DB_TIMEOUT_SECONDS;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(DB_TIMEOUT_SECONDS))
        .connect(database_url)
        .await
}
