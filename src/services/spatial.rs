//! Spatial candidate source: H3 k-ring lookup backed by a per-cell cache,
//! with a batched database fill for missed cells.

use crate::cache::{cell_cache_key, KvCache};
use crate::config::PlannerConfig;
use crate::constants::{H3_COVERAGE_FACTOR, H3_COVERAGE_MARGIN, K_RING_EXPANSION_STEP};
use crate::db::PoiRepository;
use crate::error::{AppError, Result};
use crate::geo;
use crate::models::{Coordinates, Poi, TransportMode};
use chrono::NaiveDateTime;
use h3o::{CellIndex, LatLng, Resolution};
use std::collections::HashMap;
use std::sync::Arc;

pub struct SpatialResult {
    /// Deduplicated candidates sorted by distance ascending, each annotated
    /// with `distance_meters`.
    pub pois: Vec<Poi>,
    /// The radius actually used after any progressive expansion.
    pub radius_used_m: f64,
}

pub struct SpatialCandidateSource {
    repo: Arc<dyn PoiRepository>,
    cache: Arc<dyn KvCache>,
    resolution: Resolution,
    cell_ttl_seconds: u64,
    candidates_floor: usize,
    progressive_expansion: bool,
}

impl SpatialCandidateSource {
    pub fn new(
        repo: Arc<dyn PoiRepository>,
        cache: Arc<dyn KvCache>,
        config: &PlannerConfig,
        cell_ttl_seconds: u64,
    ) -> Result<Self> {
        let resolution = Resolution::try_from(config.h3_resolution)
            .map_err(|_| AppError::Internal(format!("Bad H3 resolution {}", config.h3_resolution)))?;

        Ok(SpatialCandidateSource {
            repo,
            cache,
            resolution,
            cell_ttl_seconds,
            candidates_floor: config.max_candidates_floor,
            progressive_expansion: config.progressive_expansion,
        })
    }

    /// All POIs within the mode's radius of `center`, optionally filtered to
    /// those whose opening hours overlap `window`. Widens the ring when the
    /// pool comes up short and expansion is enabled.
    pub async fn candidates(
        &self,
        center: Coordinates,
        mode: TransportMode,
        window: Option<(NaiveDateTime, NaiveDateTime)>,
    ) -> Result<SpatialResult> {
        let origin = LatLng::new(center.lat, center.lon)
            .map_err(|e| AppError::InvalidRequest(format!("Bad coordinates: {}", e)))?;
        let center_cell = origin.to_cell(self.resolution);

        let base_k = mode.k_ring();
        let max_k = base_k * 2;
        let mut k = base_k;

        loop {
            let radius_used_m = if k == base_k {
                mode.radius_m()
            } else {
                self.coverage_radius_m(k)
            };

            let cells: Vec<CellIndex> = center_cell.grid_disk(k);
            let by_cell = self.load_cells(&cells).await?;

            let mut unique: HashMap<String, Poi> = HashMap::new();
            for pois in by_cell.values() {
                for poi in pois {
                    let distance = geo::haversine_m(&center, &poi.coordinates());
                    if distance > radius_used_m {
                        continue;
                    }
                    unique
                        .entry(poi.id.clone())
                        .or_insert_with(|| {
                            let mut poi = poi.clone();
                            poi.distance_meters = Some(distance);
                            poi
                        });
                }
            }

            let mut pois: Vec<Poi> = unique.into_values().collect();

            if let Some((start, end)) = window {
                let before = pois.len();
                pois.retain(|p| p.open_hours.overlaps_window(start, end));
                tracing::debug!(
                    before = before,
                    after = pois.len(),
                    "Filtered spatial candidates by time window"
                );
            }

            pois.sort_by(|a, b| {
                let da = a.distance_meters.unwrap_or(f64::MAX);
                let db = b.distance_meters.unwrap_or(f64::MAX);
                da.partial_cmp(&db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });

            let enough = pois.len() >= self.candidates_floor;
            if enough || !self.progressive_expansion || k >= max_k {
                if !enough && self.progressive_expansion {
                    tracing::warn!(
                        candidates = pois.len(),
                        floor = self.candidates_floor,
                        k = k,
                        "Candidate floor not reached at maximum ring"
                    );
                }
                tracing::info!(
                    mode = %mode,
                    k = k,
                    cells = cells.len(),
                    candidates = pois.len(),
                    radius_m = radius_used_m,
                    "Spatial search complete"
                );
                return Ok(SpatialResult { pois, radius_used_m });
            }

            k = (k + K_RING_EXPANSION_STEP).min(max_k);
            tracing::debug!(
                candidates = pois.len(),
                floor = self.candidates_floor,
                next_k = k,
                "Widening k-ring for candidate floor"
            );
        }
    }

    /// Ring coverage radius for `k` rings at this resolution, with margin.
    fn coverage_radius_m(&self, k: u32) -> f64 {
        self.resolution.edge_length_m() * k as f64 * H3_COVERAGE_FACTOR * H3_COVERAGE_MARGIN
    }

    /// Read cells from the cache; fill every miss from the store in one
    /// bounding-box query, distributing rows back to their owning cells.
    /// Empty cells are cached too, so cold areas do not re-query.
    async fn load_cells(&self, cells: &[CellIndex]) -> Result<HashMap<CellIndex, Vec<Poi>>> {
        let resolution_id = u8::from(self.resolution);
        let keys: Vec<String> = cells
            .iter()
            .map(|c| cell_cache_key(resolution_id, &c.to_string()))
            .collect();

        let cached = self.cache.get_many(&keys).await;

        let mut result: HashMap<CellIndex, Vec<Poi>> = HashMap::new();
        let mut misses: Vec<CellIndex> = Vec::new();

        for (cell, value) in cells.iter().zip(cached) {
            match value.and_then(|v| serde_json::from_str::<Vec<Poi>>(&v).ok()) {
                Some(pois) => {
                    result.insert(*cell, pois);
                }
                None => misses.push(*cell),
            }
        }

        tracing::debug!(
            hits = result.len(),
            misses = misses.len(),
            "Cell cache lookup"
        );

        if misses.is_empty() {
            return Ok(result);
        }

        let fresh = self.fill_cells(&misses).await?;
        for (cell, pois) in &fresh {
            let key = cell_cache_key(resolution_id, &cell.to_string());
            match serde_json::to_string(pois) {
                Ok(json) => self.cache.set_ex(&key, &json, self.cell_ttl_seconds).await,
                Err(e) => tracing::warn!("Failed to serialize cell {}: {}", cell, e),
            }
        }
        result.extend(fresh);

        Ok(result)
    }

    async fn fill_cells(&self, cells: &[CellIndex]) -> Result<HashMap<CellIndex, Vec<Poi>>> {
        // One bbox over all missed cell centers, padded by a cell edge so
        // boundary POIs are not lost.
        let mut min_lat = f64::INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        let mut min_lon = f64::INFINITY;
        let mut max_lon = f64::NEG_INFINITY;

        for cell in cells {
            let center = LatLng::from(*cell);
            min_lat = min_lat.min(center.lat());
            max_lat = max_lat.max(center.lat());
            min_lon = min_lon.min(center.lng());
            max_lon = max_lon.max(center.lng());
        }

        let margin_deg = self.resolution.edge_length_m() * 1.05 / 111_000.0;
        let rows = self
            .repo
            .find_in_bbox(
                min_lat - margin_deg,
                max_lat + margin_deg,
                min_lon - margin_deg,
                max_lon + margin_deg,
            )
            .await?;

        let mut result: HashMap<CellIndex, Vec<Poi>> =
            cells.iter().map(|c| (*c, Vec::new())).collect();

        let mut distributed = 0usize;
        for poi in rows {
            let cell = match LatLng::new(poi.lat, poi.lon) {
                Ok(ll) => ll.to_cell(self.resolution),
                Err(_) => continue,
            };
            // The bbox over-fetches; only rows whose own cell was requested
            // belong to this fill.
            if let Some(bucket) = result.get_mut(&cell) {
                bucket.push(poi);
                distributed += 1;
            }
        }

        tracing::debug!(
            cells = cells.len(),
            distributed = distributed,
            "Filled cell cache from store"
        );

        Ok(result)
    }
}
