use crate::error::Result;
use crate::models::Poi;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait PoiRepository: Send + Sync {
    async fn find_in_bbox(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Vec<Poi>>;

    /// Batch hydration by id list; order of the result is unspecified.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Poi>>;

    async fn visited_poi_ids(&self, user_id: Uuid) -> Result<Vec<String>>;

    async fn count(&self) -> Result<i64>;
}

pub struct PgPoiRepository {
    pool: sqlx::PgPool,
}

impl PgPoiRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

#[async_trait]
impl PoiRepository for PgPoiRepository {
    async fn find_in_bbox(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Vec<Poi>> {
        Ok(super::poi_queries::find_pois_in_bbox(&self.pool, min_lat, max_lat, min_lon, max_lon)
            .await?)
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Poi>> {
        Ok(super::poi_queries::find_pois_by_ids(&self.pool, ids).await?)
    }

    async fn visited_poi_ids(&self, user_id: Uuid) -> Result<Vec<String>> {
        Ok(super::poi_queries::visited_poi_ids(&self.pool, user_id).await?)
    }

    async fn count(&self) -> Result<i64> {
        Ok(super::poi_queries::count_pois(&self.pool).await?)
    }
}
