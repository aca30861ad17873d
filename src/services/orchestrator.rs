//! End-to-end planning: query expansion, spatial + semantic candidate
//! acquisition, tour construction on the blocking worker pool, arrival
//! validation, and the per-user cache write as the final step.

use crate::config::PlannerConfig;
use crate::db::PoiRepository;
use crate::error::{AppError, Result};
use crate::models::{
    Coordinates, Poi, ReplaceFullRouteRequest, Route, RouteStop, SearchRoutesRequest,
    SearchRoutesResponse, SpatialInfo, TimingBreakdown, TransportMode,
};
use crate::planner::{self, validator, BuiltRoute, PlannerInput};
use crate::services::expansion::{expand_query, ExpandedQuery};
use crate::services::semantic::SemanticCandidateSource;
use crate::services::spatial::SpatialCandidateSource;
use crate::services::user_routes::{RoutePoiRef, UserRouteEntry, UserRouteStore};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

pub struct RoutePlanningService {
    spatial: SpatialCandidateSource,
    semantic: SemanticCandidateSource,
    repo: Arc<dyn PoiRepository>,
    user_routes: Arc<UserRouteStore>,
    config: PlannerConfig,
}

struct PlanOutcome {
    pool: Vec<Poi>,
    routes: Vec<BuiltRoute>,
    spatial_info: SpatialInfo,
    timing: TimingBreakdown,
    warnings: Vec<String>,
}

impl RoutePlanningService {
    pub fn new(
        spatial: SpatialCandidateSource,
        semantic: SemanticCandidateSource,
        repo: Arc<dyn PoiRepository>,
        user_routes: Arc<UserRouteStore>,
        config: PlannerConfig,
    ) -> Self {
        RoutePlanningService {
            spatial,
            semantic,
            repo,
            user_routes,
            config,
        }
    }

    /// Full planning request: up to `max_routes` tours, cached per user.
    pub async fn search_routes(&self, req: &SearchRoutesRequest) -> Result<SearchRoutesResponse> {
        if req.delete_cache {
            if let Some(user_id) = req.user_id {
                self.user_routes.delete(user_id).await;
                tracing::info!(user = %user_id, "Dropped route cache before planning");
            }
        }

        let replace_route = req.replace_route;
        let max_routes = if replace_route.is_some() { 1 } else { req.max_routes };

        let center = Coordinates::new(req.lat, req.lon).map_err(AppError::InvalidRequest)?;
        let expanded = expand_query(
            &req.query,
            req.customer_like,
            req.current_time,
            req.max_time_minutes,
            &self.config,
        );
        if expanded.categories.is_empty() {
            return Err(AppError::InvalidRequest(
                "query contains no recognizable interest".to_string(),
            ));
        }

        let outcome = self
            .plan(
                center,
                req.mode,
                &expanded,
                req.user_id,
                req.max_time_minutes,
                req.target_places,
                max_routes,
                req.top_k_semantic,
                req.current_time,
            )
            .await?;

        let routes = self.format_routes(&outcome, replace_route, req.current_time);

        // Cache write is the last step: any earlier failure leaves the
        // user's entry untouched.
        if let Some(user_id) = req.user_id {
            if !routes.is_empty() {
                self.write_user_entry(user_id, req.mode, &outcome.pool, &routes, replace_route)
                    .await?;
            }
        }

        Ok(SearchRoutesResponse {
            routes,
            spatial_info: outcome.spatial_info,
            timing_breakdown: outcome.timing,
            warnings: outcome.warnings,
        })
    }

    /// Rebuild one cached route from a fresh query, leaving the others alone.
    pub async fn replace_full_route(&self, req: &ReplaceFullRouteRequest) -> Result<Route> {
        let route_number: u32 = req.route_id.parse().map_err(|_| {
            AppError::InvalidRequest(format!("route_id '{}' is not numeric", req.route_id))
        })?;
        if route_number == 0 {
            return Err(AppError::InvalidRequest("route ids start at 1".to_string()));
        }

        let expanded = expand_query(
            &req.new_query,
            false,
            req.current_time,
            req.max_time_minutes,
            &self.config,
        );
        if expanded.categories.is_empty() {
            return Err(AppError::InvalidRequest(
                "new_query contains no recognizable interest".to_string(),
            ));
        }

        let outcome = self
            .plan(
                req.user_location,
                req.mode,
                &expanded,
                Some(req.user_id),
                req.max_time_minutes,
                req.target_places,
                1,
                crate::constants::DEFAULT_TOP_K_SEMANTIC,
                req.current_time,
            )
            .await?;

        let mut routes = self.format_routes(&outcome, Some(route_number), req.current_time);
        let route = routes.pop().ok_or_else(|| {
            AppError::Exhausted("no feasible route for the new query".to_string())
        })?;

        self.write_user_entry(
            req.user_id,
            req.mode,
            &outcome.pool,
            std::slice::from_ref(&route),
            Some(route_number),
        )
        .await?;

        Ok(route)
    }

    pub async fn visited_pois(&self, user_id: Uuid) -> Result<Vec<String>> {
        self.repo.visited_poi_ids(user_id).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn plan(
        &self,
        center: Coordinates,
        mode: TransportMode,
        expanded: &ExpandedQuery,
        user_id: Option<Uuid>,
        max_time_minutes: f64,
        target_places: usize,
        max_routes: usize,
        top_k_semantic: usize,
        current_time: Option<NaiveDateTime>,
    ) -> Result<PlanOutcome> {
        let total_start = Instant::now();
        let mut warnings = Vec::new();

        // Spatial pool, optionally pre-filtered by the request time window.
        let window = current_time
            .map(|t| (t, t + Duration::seconds((max_time_minutes * 60.0) as i64)));
        let spatial_start = Instant::now();
        let spatial = self.spatial.candidates(center, mode, window).await?;
        let spatial_ms = spatial_start.elapsed().as_millis() as u64;

        let mut spatial_pois = spatial.pois;

        // POIs this user already visited are excluded from planning.
        if let Some(user_id) = user_id {
            let visited = self.repo.visited_poi_ids(user_id).await?;
            if !visited.is_empty() {
                let before = spatial_pois.len();
                spatial_pois.retain(|p| !visited.contains(&p.id));
                tracing::debug!(
                    removed = before - spatial_pois.len(),
                    "Excluded visited POIs"
                );
            }
        }

        let spatial_info = SpatialInfo {
            radius_used_m: spatial.radius_used_m,
            total_spatial_candidates: spatial_pois.len(),
        };

        if spatial_pois.is_empty() {
            warnings.push("no POIs within the search radius".to_string());
            return Ok(PlanOutcome {
                pool: vec![],
                routes: vec![],
                spatial_info,
                timing: TimingBreakdown {
                    spatial_ms,
                    total_ms: total_start.elapsed().as_millis() as u64,
                    ..TimingBreakdown::default()
                },
                warnings,
            });
        }

        // Semantic pass constrained to the spatial ids: the pool is the
        // intersection of both sources, hydrated once.
        let prefetched: HashMap<String, Poi> = spatial_pois
            .iter()
            .map(|p| (p.id.clone(), p.clone()))
            .collect();
        let id_filter: Vec<String> = spatial_pois.iter().map(|p| p.id.clone()).collect();

        let (pool, semantic_timings) = self
            .semantic
            .candidates(
                &expanded.categories,
                top_k_semantic,
                Some(&id_filter),
                &prefetched,
            )
            .await?;

        if pool.is_empty() {
            warnings.push("no semantic matches among nearby POIs".to_string());
            return Ok(PlanOutcome {
                pool: vec![],
                routes: vec![],
                spatial_info,
                timing: TimingBreakdown {
                    spatial_ms,
                    embedding_ms: semantic_timings.embedding_ms,
                    vector_search_ms: semantic_timings.vector_search_ms,
                    db_hydration_ms: semantic_timings.db_hydration_ms,
                    total_ms: total_start.elapsed().as_millis() as u64,
                    ..TimingBreakdown::default()
                },
                warnings,
            });
        }

        // Tour construction is CPU-bound: run it on the blocking pool so the
        // event loop keeps serving other requests.
        let input = PlannerInput {
            user: center,
            pool: pool.clone(),
            mode,
            max_time_minutes,
            target_places,
            max_routes,
            current_time,
            meal_anchor: expanded.meal_anchor,
            meal_windows: expanded.meal_windows.clone(),
        };
        let config = self.config.clone();

        let build_start = Instant::now();
        let routes = tokio::task::spawn_blocking(move || planner::build_routes(&input, &config))
            .await
            .map_err(|e| AppError::Internal(format!("route builder panicked: {}", e)))?;
        let build_ms = build_start.elapsed().as_millis() as u64;

        if routes.is_empty() {
            warnings.push("no feasible route within the time budget".to_string());
        }

        tracing::info!(
            routes = routes.len(),
            pool = pool.len(),
            build_ms = build_ms,
            "Planning complete"
        );

        Ok(PlanOutcome {
            pool,
            routes,
            spatial_info,
            timing: TimingBreakdown {
                spatial_ms,
                embedding_ms: semantic_timings.embedding_ms,
                vector_search_ms: semantic_timings.vector_search_ms,
                db_hydration_ms: semantic_timings.db_hydration_ms,
                build_ms,
                total_ms: total_start.elapsed().as_millis() as u64,
            },
            warnings,
        })
    }

    /// Shape built routes for the response, numbering them and annotating
    /// arrivals when a start time is known.
    fn format_routes(
        &self,
        outcome: &PlanOutcome,
        replace_route: Option<u32>,
        current_time: Option<NaiveDateTime>,
    ) -> Vec<Route> {
        outcome
            .routes
            .iter()
            .enumerate()
            .map(|(i, built)| {
                let route_id = replace_route.unwrap_or(i as u32 + 1);
                let report = current_time
                    .map(|start| validator::validate_route(&outcome.pool, built, start));

                let stops: Vec<RouteStop> = built
                    .stops
                    .iter()
                    .enumerate()
                    .map(|(order, stop)| {
                        let poi = &outcome.pool[stop.pool_index];
                        let timing = report.as_ref().map(|r| &r.timings[order]);
                        RouteStop {
                            poi_id: poi.id.clone(),
                            name: poi.name.clone(),
                            category: poi.category.clone(),
                            address: poi.address.clone(),
                            lat: poi.lat,
                            lon: poi.lon,
                            order: order as u32 + 1,
                            similarity: poi.similarity_score(),
                            rating: poi.rating,
                            combined_score: stop.combined_score,
                            travel_time_minutes: stop.travel_minutes,
                            stay_time_minutes: stop.stay_minutes,
                            arrival_time: timing
                                .map(|t| t.arrival.format("%Y-%m-%d %H:%M:%S").to_string()),
                            opening_hours_today: timing.map(|t| t.hours_summary.clone()),
                        }
                    })
                    .collect();

                let stop_count = stops.len().max(1) as f64;
                Route {
                    route_id,
                    total_time_minutes: built.total_minutes,
                    travel_time_minutes: built.travel_minutes,
                    stay_time_minutes: built.stay_minutes,
                    total_score: built.total_score,
                    avg_score: built.total_score / stop_count,
                    efficiency: if built.total_minutes > 0.0 {
                        built.total_score / (built.total_minutes / 100.0)
                    } else {
                        0.0
                    },
                    direction: built.direction.map(|d| d.to_string()),
                    is_valid_timing: report.as_ref().map(|r| r.is_valid_timing),
                    timing_warnings: report.map(|r| r.warnings).unwrap_or_default(),
                    construction_warnings: built.warnings.clone(),
                    stops,
                }
            })
            .collect()
    }

    /// Write (or update) the user's route-cache entry. A full plan replaces
    /// the entry wholesale; a single-route replacement only overwrites that
    /// route id and refreshes the availability pools.
    async fn write_user_entry(
        &self,
        user_id: Uuid,
        mode: TransportMode,
        pool: &[Poi],
        routes: &[Route],
        replace_route: Option<u32>,
    ) -> Result<()> {
        let mut entry = match replace_route {
            Some(_) => self
                .user_routes
                .load(user_id)
                .await?
                .unwrap_or_else(|| UserRouteEntry::new(user_id, mode)),
            None => UserRouteEntry::new(user_id, mode),
        };
        entry.transportation_mode = mode;

        for route in routes {
            let stops: Vec<RoutePoiRef> = route
                .stops
                .iter()
                .map(|s| RoutePoiRef {
                    poi_id: s.poi_id.clone(),
                    category: s.category.clone(),
                })
                .collect();
            entry.put_route(route.route_id, stops);
        }

        entry.merge_available(pool);
        self.user_routes.save(&mut entry).await
    }
}
