//! Single-POI substitution against the per-user route cache: rank unused
//! same-category alternatives for one stop, then swap one in on confirmation.

use crate::config::PlannerConfig;
use crate::constants::{REPLACEMENT_PROXIMITY_WEIGHT, REPLACEMENT_RATING_WEIGHT};
use crate::db::PoiRepository;
use crate::error::{AppError, Result};
use crate::geo;
use crate::models::{
    ConfirmReplaceRequest, Coordinates, Poi, ReplacePoiRequest, ReplacementCandidate,
};
use crate::services::user_routes::{RoutePoiRef, UserRouteStore};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;

pub struct SubstitutionService {
    store: Arc<UserRouteStore>,
    repo: Arc<dyn PoiRepository>,
    config: PlannerConfig,
}

impl SubstitutionService {
    pub fn new(
        store: Arc<UserRouteStore>,
        repo: Arc<dyn PoiRepository>,
        config: PlannerConfig,
    ) -> Self {
        SubstitutionService {
            store,
            repo,
            config,
        }
    }

    /// Rank replacement candidates for one stop. Candidates come from the
    /// cached availability pool of the stop's category, minus everything
    /// already routed or previously swapped out.
    pub async fn replace_poi(&self, req: &ReplacePoiRequest) -> Result<Vec<ReplacementCandidate>> {
        let entry = self
            .store
            .load(req.user_id)
            .await?
            .ok_or_else(|| AppError::CacheMiss(format!("No cached routes for user {}", req.user_id)))?;

        let route = entry
            .routes
            .get(&req.route_id)
            .ok_or_else(|| AppError::CacheMiss(format!("Route '{}' not found", req.route_id)))?;

        let target_index = route
            .iter()
            .position(|r| r.poi_id == req.old_poi_id)
            .ok_or_else(|| {
                AppError::CacheMiss(format!(
                    "POI '{}' is not part of route '{}'",
                    req.old_poi_id, req.route_id
                ))
            })?;
        let category = route[target_index].category.clone();
        let category_key = category.to_string();

        // Pool: available[category] minus substituted[category] minus every
        // POI currently routed (any route).
        let substituted = entry.substituted_ids();
        let members = entry.route_member_ids();
        let pool_ids: Vec<String> = entry
            .available_by_category
            .get(&category_key)
            .map(|ids| {
                ids.iter()
                    .filter(|id| !substituted.contains(*id) && !members.contains(*id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if pool_ids.is_empty() {
            return Err(AppError::Exhausted(format!(
                "no unused alternatives left in category '{}'",
                category_key
            )));
        }

        // Hydrate the candidates and the affected route for leg geometry.
        let route_ids: Vec<String> = route.iter().map(|r| r.poi_id.clone()).collect();
        let route_pois = self.hydrate_map(&route_ids).await?;
        let candidates = self.repo.find_by_ids(&pool_ids).await?;

        let route_coords = self.route_coordinates(route, &route_pois, req.user_location)?;
        let prev = route_coords[target_index]; // coords of the stop before target
        let next = route_coords[target_index + 2]; // stop after target (or user)
        let old_poi = route_pois.get(&req.old_poi_id).ok_or_else(|| {
            AppError::Internal(format!("POI '{}' missing from store", req.old_poi_id))
        })?;

        // Projected arrival at the target slot, with the candidate's leg
        // substituted in for the final hop.
        let lead_minutes = self.minutes_before_index(&route_coords, target_index, req);

        let mut open_candidates = Vec::new();
        for poi in candidates {
            if let Some(start) = req.current_time {
                let leg = req
                    .mode
                    .travel_minutes(geo::haversine_m(&prev, &poi.coordinates()));
                let arrival = start + Duration::seconds(((lead_minutes + leg) * 60.0) as i64);
                if !poi.open_hours.is_open_at(arrival) {
                    continue;
                }
            }
            open_candidates.push(poi);
        }

        if open_candidates.is_empty() {
            return Err(AppError::Exhausted(format!(
                "every alternative in category '{}' is closed at the projected arrival",
                category_key
            )));
        }

        // Score: rating plus proximity to the midpoint of the two incident
        // legs, normalized by the worst candidate.
        let old_legs = geo::haversine_m(&prev, &old_poi.coordinates())
            + geo::haversine_m(&old_poi.coordinates(), &next);

        let ref_dists: Vec<f64> = open_candidates
            .iter()
            .map(|p| {
                (geo::haversine_m(&prev, &p.coordinates())
                    + geo::haversine_m(&p.coordinates(), &next))
                    / 2.0
            })
            .collect();
        let max_ref = ref_dists.iter().fold(0.0_f64, |acc, d| acc.max(*d));

        let mut ranked: Vec<ReplacementCandidate> = open_candidates
            .into_iter()
            .zip(ref_dists)
            .map(|(poi, ref_dist)| {
                let proximity = if max_ref > 0.0 {
                    1.0 - ref_dist / max_ref
                } else {
                    1.0
                };
                let score = REPLACEMENT_RATING_WEIGHT * poi.rating
                    + REPLACEMENT_PROXIMITY_WEIGHT * proximity;

                let new_legs = ref_dist * 2.0;
                let distance_delta_meters = new_legs - old_legs;
                let time_delta_minutes = req.mode.travel_minutes(new_legs)
                    - req.mode.travel_minutes(old_legs);

                ReplacementCandidate {
                    poi,
                    replacement_score: score,
                    distance_delta_meters,
                    time_delta_minutes,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.replacement_score
                .partial_cmp(&a.replacement_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.poi
                        .rating
                        .partial_cmp(&a.poi.rating)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.poi.id.cmp(&b.poi.id))
        });
        ranked.truncate(req.top_k);

        Ok(ranked)
    }

    /// Swap the stop in place and update the bookkeeping sets. Conflicts
    /// (entry rewritten concurrently) surface instead of overwriting.
    pub async fn confirm_replace(&self, req: &ConfirmReplaceRequest) -> Result<Vec<RoutePoiRef>> {
        let mut entry = self
            .store
            .load(req.user_id)
            .await?
            .ok_or_else(|| AppError::CacheMiss(format!("No cached routes for user {}", req.user_id)))?;

        let target_index = entry
            .position_in_route(&req.route_id, &req.old_poi_id)
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "POI '{}' is no longer part of route '{}'",
                    req.old_poi_id, req.route_id
                ))
            })?;

        let category = entry.routes[&req.route_id][target_index].category.clone();
        let category_key = category.to_string();

        let still_available = entry
            .available_by_category
            .get(&category_key)
            .map(|ids| ids.contains(&req.new_poi_id))
            .unwrap_or(false);
        if !still_available {
            return Err(AppError::Conflict(format!(
                "replacement '{}' is no longer available in category '{}'",
                req.new_poi_id, category_key
            )));
        }

        if let Some(route) = entry.routes.get_mut(&req.route_id) {
            route[target_index] = RoutePoiRef {
                poi_id: req.new_poi_id.clone(),
                category: category.clone(),
            };
        }
        entry.mark_substituted(&category, req.old_poi_id.clone());

        // save() re-normalizes: the new id leaves the availability set as a
        // route member, and the old id stays excluded as substituted.
        self.store.save(&mut entry).await?;

        Ok(entry.routes[&req.route_id].clone())
    }

    async fn hydrate_map(&self, ids: &[String]) -> Result<HashMap<String, Poi>> {
        Ok(self
            .repo
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect())
    }

    /// Coordinates along the cached route: user, stop 0, ..., stop n-1, user.
    fn route_coordinates(
        &self,
        route: &[RoutePoiRef],
        records: &HashMap<String, Poi>,
        user: Coordinates,
    ) -> Result<Vec<Coordinates>> {
        let mut coords = Vec::with_capacity(route.len() + 2);
        coords.push(user);
        for stop in route {
            let poi = records.get(&stop.poi_id).ok_or_else(|| {
                AppError::Internal(format!("POI '{}' missing from store", stop.poi_id))
            })?;
            coords.push(poi.coordinates());
        }
        coords.push(user);
        Ok(coords)
    }

    /// Minutes spent before the leg into the target slot: all earlier legs
    /// plus all earlier stays.
    fn minutes_before_index(
        &self,
        route_coords: &[Coordinates],
        target_index: usize,
        req: &ReplacePoiRequest,
    ) -> f64 {
        let mut minutes = 0.0;
        for leg in 0..target_index {
            let d = geo::haversine_m(&route_coords[leg], &route_coords[leg + 1]);
            minutes += req.mode.travel_minutes(d);
            minutes += self.config.default_stay_minutes;
        }
        minutes
    }
}
