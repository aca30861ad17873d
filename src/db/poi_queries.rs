use crate::models::{OpeningHours, Poi, PoiCategory};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn find_pois_in_bbox(
    pool: &PgPool,
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
) -> Result<Vec<Poi>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PoiRow>(
        r#"
        SELECT id, name, poi_type, address, lat, lon,
               COALESCE(normalize_stars_reviews, 0.5) AS rating,
               open_hours
        FROM pois
        WHERE lat BETWEEN $1 AND $2
          AND lon BETWEEN $3 AND $4
        "#,
    )
    .bind(min_lat)
    .bind(max_lat)
    .bind(min_lon)
    .bind(max_lon)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PoiRow::into_poi).collect())
}

pub async fn find_pois_by_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<Poi>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, PoiRow>(
        r#"
        SELECT id, name, poi_type, address, lat, lon,
               COALESCE(normalize_stars_reviews, 0.5) AS rating,
               open_hours
        FROM pois
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PoiRow::into_poi).collect())
}

/// POI ids an external collaborator marked as visited by this user.
pub async fn visited_poi_ids(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT poi_id FROM visited_pois WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn count_pois(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM pois")
        .fetch_one(pool)
        .await
}

#[derive(sqlx::FromRow)]
struct PoiRow {
    id: String,
    name: String,
    poi_type: String,
    address: Option<String>,
    lat: f64,
    lon: f64,
    rating: f64,
    open_hours: Option<serde_json::Value>,
}

impl PoiRow {
    fn into_poi(self) -> Poi {
        // Malformed hours degrade to the always-open default instead of
        // failing the whole result set.
        let open_hours = self
            .open_hours
            .and_then(|v| serde_json::from_value::<OpeningHours>(v).ok())
            .unwrap_or_default();

        let category: PoiCategory = self.poi_type.parse().unwrap_or(PoiCategory::Other(
            self.poi_type.clone(),
        ));

        Poi {
            id: self.id,
            name: self.name,
            category,
            lat: self.lat,
            lon: self.lon,
            address: self.address.unwrap_or_default(),
            rating: self.rating.clamp(0.0, 1.0),
            open_hours,
            similarity: None,
            distance_meters: None,
        }
    }
}
