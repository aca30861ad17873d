//! Tour construction: greedy selection of an opening stop, direction-aware
//! middle stops and a closing stop near the user, under a shared time budget.
//! The module is pure and CPU-bound; the orchestrator runs it on the
//! blocking worker pool.

pub mod scoring;
pub mod validator;

use crate::config::{DirectionPreference, PlannerConfig};
use crate::geo;
use crate::models::{Coordinates, Poi, PoiCategory, TransportMode};
use chrono::{Duration, NaiveDateTime};
use scoring::{
    bearing_score, combined_score, distance_score, weights_for, StopPosition,
    CLOSING_RADIUS_STEPS,
};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Right,
    Left,
}

impl fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnDirection::Right => write!(f, "right"),
            TurnDirection::Left => write!(f, "left"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlannerInput {
    pub user: Coordinates,
    /// Hydrated candidate pool; similarity and rating ride on each POI.
    pub pool: Vec<Poi>,
    pub mode: TransportMode,
    pub max_time_minutes: f64,
    pub target_places: usize,
    pub max_routes: usize,
    pub current_time: Option<NaiveDateTime>,
    /// One Restaurant stop must land inside an overlapping meal window.
    pub meal_anchor: bool,
    pub meal_windows: Vec<(NaiveDateTime, NaiveDateTime)>,
}

#[derive(Debug, Clone)]
pub struct BuiltStop {
    pub pool_index: usize,
    pub travel_minutes: f64,
    pub stay_minutes: f64,
    pub combined_score: f64,
}

#[derive(Debug, Clone)]
pub struct BuiltRoute {
    pub stops: Vec<BuiltStop>,
    /// Includes the return leg back to the user.
    pub travel_minutes: f64,
    pub stay_minutes: f64,
    pub total_minutes: f64,
    /// Sum of per-stop combined scores.
    pub total_score: f64,
    pub direction: Option<TurnDirection>,
    pub warnings: Vec<String>,
}

/// Build up to `max_routes` tours from the pool. Routes are disjoint in POIs
/// unless the pool runs dry, in which case later routes may repeat earlier
/// selections. If opening-hours filtering leaves nothing at all, the request
/// is rebuilt without it so the arrival validator can flag the closures.
pub fn build_routes(input: &PlannerInput, config: &PlannerConfig) -> Vec<BuiltRoute> {
    if input.pool.is_empty() || input.target_places == 0 || input.max_routes == 0 {
        return Vec::new();
    }

    let ctx = BuildContext::new(input, config);
    let mut routes = ctx.build_all(true);

    if routes.is_empty() && input.current_time.is_some() {
        routes = ctx.build_all(false);
        for route in &mut routes {
            route.warnings.push(
                "opening-hours filter relaxed: no feasible route with every stop open".to_string(),
            );
        }
    }

    routes
}

/// Selection constraint on the next stop's category.
enum CategoryRule {
    Any,
    /// Must be exactly this category (meal insertion).
    Require(PoiCategory),
    /// Must differ from this category (interleaving).
    Differ(PoiCategory),
}

struct BuildContext<'a> {
    input: &'a PlannerInput,
    config: &'a PlannerConfig,
    /// Meters, index 0 = user.
    matrix: Vec<Vec<f64>>,
    /// Farthest pool distance from the user; basis for closing thresholds.
    max_radius_m: f64,
    /// Mode radius; normalizer for distance scores.
    r_max_m: f64,
    target: usize,
}

#[derive(Default)]
struct RouteState {
    stops: Vec<BuiltStop>,
    visited: HashSet<usize>,
    /// Matrix index of the current position (0 = user).
    pos: usize,
    travel_minutes: f64,
    stay_minutes: f64,
    prev_bearing: Option<f64>,
    direction: Option<TurnDirection>,
    restaurant_inserted: bool,
    warnings: Vec<String>,
}

struct Scored {
    index: usize,
    score: f64,
}

impl<'a> BuildContext<'a> {
    fn new(input: &'a PlannerInput, config: &'a PlannerConfig) -> Self {
        let points: Vec<Coordinates> = input.pool.iter().map(|p| p.coordinates()).collect();
        let matrix = geo::distance_matrix(&input.user, &points);
        let max_radius_m = matrix[0][1..]
            .iter()
            .fold(0.0_f64, |acc, d| acc.max(*d));

        BuildContext {
            input,
            config,
            matrix,
            max_radius_m,
            r_max_m: input.mode.radius_m(),
            target: input.target_places.min(input.pool.len()),
        }
    }

    fn build_all(&self, respect_hours: bool) -> Vec<BuiltRoute> {
        let mut used: HashSet<usize> = HashSet::new();
        let mut routes = Vec::new();

        for _ in 0..self.input.max_routes {
            let free: Vec<usize> = (0..self.input.pool.len())
                .filter(|i| !used.contains(i))
                .collect();

            let mut route = if free.is_empty() {
                None
            } else {
                self.build_single(&free, respect_hours)
            };

            // Pool exhausted by earlier routes: allow repetition as a last
            // resort so the requested route count can still be reached.
            if route.is_none() && !used.is_empty() {
                let all: Vec<usize> = (0..self.input.pool.len()).collect();
                route = self.build_single(&all, respect_hours).map(|mut r| {
                    r.warnings.push(
                        "candidate pool exhausted; route repeats stops from earlier routes"
                            .to_string(),
                    );
                    r
                });
            }

            match route {
                Some(route) => {
                    used.extend(route.stops.iter().map(|s| s.pool_index));
                    routes.push(route);
                }
                None => break,
            }
        }

        routes
    }

    fn build_single(&self, usable: &[usize], respect_hours: bool) -> Option<BuiltRoute> {
        let mut st = RouteState::default();

        let first = self.select_first(usable, respect_hours)?;
        self.push_stop(&mut st, first);

        // A meal-anchored Restaurant chosen as opener (only possible via the
        // all-restaurants fallback) counts as the inserted meal stop when it
        // lands inside a window.
        if self.input.meal_anchor
            && self.input.pool[st.stops[0].pool_index].category == PoiCategory::Restaurant
        {
            if let Some(arrival) = self.arrival_at(st.stops[0].travel_minutes, 0.0) {
                st.restaurant_inserted = self.in_meal_window(arrival);
            }
        }

        while st.stops.len() + 1 < self.target {
            match self.select_middle(usable, &mut st, respect_hours) {
                Some(selected) => self.push_stop(&mut st, selected),
                None => break, // budget or pool ran out: truncate
            }
        }

        if st.stops.len() < self.target {
            if let Some(selected) = self.select_closing(usable, &mut st, respect_hours) {
                self.push_stop(&mut st, selected);
            }
        }

        // Return leg back to the user closes the loop.
        st.travel_minutes += self.travel_minutes(self.matrix[st.pos][0]);

        let total_minutes = st.travel_minutes + st.stay_minutes;
        let total_score: f64 = st.stops.iter().map(|s| s.combined_score).sum();

        Some(BuiltRoute {
            stops: st.stops,
            travel_minutes: st.travel_minutes,
            stay_minutes: st.stay_minutes,
            total_minutes,
            total_score,
            direction: st.direction,
            warnings: st.warnings,
        })
    }

    fn select_first(&self, usable: &[usize], respect_hours: bool) -> Option<Scored> {
        // Restaurants are reserved for the meal window until one is placed.
        let reserved = self.gather_first(usable, respect_hours, true);
        let candidates = if reserved.is_empty() && self.input.meal_anchor {
            self.gather_first(usable, respect_hours, false)
        } else {
            reserved
        };

        self.pick_best(candidates)
    }

    fn gather_first(&self, usable: &[usize], respect_hours: bool, reserve: bool) -> Vec<Scored> {
        let mut out = Vec::new();
        for &i in usable {
            let poi = &self.input.pool[i];
            if reserve && self.input.meal_anchor && poi.category == PoiCategory::Restaurant {
                continue;
            }

            let travel = self.travel_minutes(self.matrix[0][i + 1]);
            if respect_hours && !self.open_at_offset(i, travel) {
                continue;
            }
            if !self.fits_budget(0, 0.0, 0.0, i) {
                continue;
            }

            let score = combined_score(
                &weights_for(StopPosition::First, false, poi.similarity_score()),
                distance_score(self.matrix[0][i + 1], self.r_max_m),
                poi.similarity_score(),
                poi.rating,
                0.0,
            );
            out.push(Scored { index: i, score });
        }
        out
    }

    fn select_middle(
        &self,
        usable: &[usize],
        st: &mut RouteState,
        respect_hours: bool,
    ) -> Option<Scored> {
        let circular = self.config.use_circular_routing;
        let elapsed = st.travel_minutes + st.stay_minutes;

        // Meal priority: once the projected clock enters an open window and
        // no Restaurant has been placed yet, this step must place one.
        let probe = self.arrival_at(elapsed, 0.0);
        let prioritize_restaurant = self.input.meal_anchor
            && !st.restaurant_inserted
            && probe.map(|t| self.in_meal_window(t)).unwrap_or(false)
            && usable.iter().any(|&i| {
                !st.visited.contains(&i)
                    && self.input.pool[i].category == PoiCategory::Restaurant
            });

        let exclude_restaurant = self.input.meal_anchor && !prioritize_restaurant;
        let last_category = st
            .stops
            .last()
            .map(|s| self.input.pool[s.pool_index].category.clone());

        let rule = if prioritize_restaurant {
            CategoryRule::Require(PoiCategory::Restaurant)
        } else {
            match last_category {
                Some(cat) => CategoryRule::Differ(cat),
                None => CategoryRule::Any,
            }
        };

        let mut candidates =
            self.gather_middle(usable, st, respect_hours, &rule, exclude_restaurant);

        // The required / other-category pool may be empty; the constraint is
        // dropped for this step rather than cutting the route short.
        if candidates.is_empty() && !matches!(rule, CategoryRule::Any) {
            candidates =
                self.gather_middle(usable, st, respect_hours, &CategoryRule::Any, exclude_restaurant);
        }

        if candidates.is_empty() {
            return None;
        }

        if circular {
            candidates = self.apply_direction_lock(st, candidates);
        }

        let meal_step = prioritize_restaurant;
        let best = self.pick_best(candidates)?;
        if meal_step && self.input.pool[best.index].category == PoiCategory::Restaurant {
            st.restaurant_inserted = true;
        }
        Some(best)
    }

    fn gather_middle(
        &self,
        usable: &[usize],
        st: &RouteState,
        respect_hours: bool,
        rule: &CategoryRule,
        exclude_restaurant: bool,
    ) -> Vec<Scored> {
        let circular = self.config.use_circular_routing;
        let elapsed = st.travel_minutes + st.stay_minutes;
        let here = self.position_coords(st.pos);

        let mut out = Vec::new();
        for &i in usable {
            if st.visited.contains(&i) {
                continue;
            }
            let poi = &self.input.pool[i];

            if exclude_restaurant && poi.category == PoiCategory::Restaurant {
                continue;
            }
            match rule {
                CategoryRule::Any => {}
                CategoryRule::Require(cat) => {
                    if poi.category != *cat {
                        continue;
                    }
                }
                CategoryRule::Differ(cat) => {
                    if poi.category == *cat {
                        continue;
                    }
                }
            }

            let travel = self.travel_minutes(self.matrix[st.pos][i + 1]);
            if respect_hours && !self.open_at_offset(i, elapsed + travel) {
                continue;
            }
            if !self.fits_budget(st.pos, st.travel_minutes, st.stay_minutes, i) {
                continue;
            }

            let next_bearing = geo::initial_bearing(&here, &poi.coordinates());
            let bearing = match st.prev_bearing {
                Some(prev) => bearing_score(prev, next_bearing, circular),
                None => 0.0,
            };

            let score = combined_score(
                &weights_for(StopPosition::Middle, circular, poi.similarity_score()),
                distance_score(self.matrix[st.pos][i + 1], self.r_max_m),
                poi.similarity_score(),
                poi.rating,
                bearing,
            );
            out.push(Scored { index: i, score });
        }
        out
    }

    /// Commit to a turn direction on the first middle step, then keep only
    /// candidates inside the committed cone. An empty cone falls back to the
    /// unconstrained set for this step only, recorded as a warning.
    fn apply_direction_lock(&self, st: &mut RouteState, candidates: Vec<Scored>) -> Vec<Scored> {
        let Some(prev) = st.prev_bearing else {
            return candidates;
        };
        let here = self.position_coords(st.pos);
        let tolerance = self.config.circular_angle_tolerance_deg;

        let in_cone = |index: usize, direction: TurnDirection| -> bool {
            let bearing = geo::initial_bearing(&here, &self.input.pool[index].coordinates());
            let center = match direction {
                TurnDirection::Right => (prev + 90.0) % 360.0,
                TurnDirection::Left => (prev + 270.0) % 360.0,
            };
            geo::bearing_diff(bearing, center) <= tolerance
        };

        if st.direction.is_none() {
            st.direction = Some(match self.config.circular_direction_preference {
                DirectionPreference::Right => TurnDirection::Right,
                DirectionPreference::Left => TurnDirection::Left,
                DirectionPreference::Auto => {
                    let rights = candidates
                        .iter()
                        .filter(|c| in_cone(c.index, TurnDirection::Right))
                        .count();
                    let lefts = candidates
                        .iter()
                        .filter(|c| in_cone(c.index, TurnDirection::Left))
                        .count();
                    if lefts > rights {
                        TurnDirection::Left
                    } else {
                        TurnDirection::Right
                    }
                }
            });
        }

        let Some(direction) = st.direction else {
            return candidates;
        };
        let constrained: Vec<Scored> = candidates
            .iter()
            .filter(|c| in_cone(c.index, direction))
            .map(|c| Scored {
                index: c.index,
                score: c.score,
            })
            .collect();

        if constrained.is_empty() {
            st.warnings.push(format!(
                "no candidates in {}-turn cone at stop {}; used unconstrained pool",
                direction,
                st.stops.len() + 1
            ));
            candidates
        } else {
            constrained
        }
    }

    fn select_closing(
        &self,
        usable: &[usize],
        st: &mut RouteState,
        respect_hours: bool,
    ) -> Option<Scored> {
        let circular = self.config.use_circular_routing;
        let elapsed = st.travel_minutes + st.stay_minutes;
        let here = self.position_coords(st.pos);
        let last_category = st
            .stops
            .last()
            .map(|s| self.input.pool[s.pool_index].category.clone());

        for rho in CLOSING_RADIUS_STEPS {
            let threshold = rho * self.max_radius_m;
            let mut qualified: Vec<(Scored, bool)> = Vec::new();

            for &i in usable {
                if st.visited.contains(&i) {
                    continue;
                }
                let poi = &self.input.pool[i];

                if self.input.meal_anchor && poi.category == PoiCategory::Restaurant {
                    if st.restaurant_inserted {
                        continue;
                    }
                    let travel = self.travel_minutes(self.matrix[st.pos][i + 1]);
                    let in_window = self
                        .arrival_at(elapsed, travel)
                        .map(|t| self.in_meal_window(t))
                        .unwrap_or(false);
                    if !in_window {
                        continue;
                    }
                }

                if self.matrix[i + 1][0] > threshold {
                    continue;
                }

                let travel = self.travel_minutes(self.matrix[st.pos][i + 1]);
                if respect_hours && !self.open_at_offset(i, elapsed + travel) {
                    continue;
                }
                if !self.fits_budget(st.pos, st.travel_minutes, st.stay_minutes, i) {
                    continue;
                }

                let next_bearing = geo::initial_bearing(&here, &poi.coordinates());
                let bearing = match (circular, st.prev_bearing) {
                    (true, Some(prev)) => bearing_score(prev, next_bearing, true),
                    _ => 0.0,
                };

                // Closing distance is measured to the user, not to the
                // previous stop.
                let score = combined_score(
                    &weights_for(StopPosition::Last, circular, poi.similarity_score()),
                    distance_score(self.matrix[i + 1][0], self.r_max_m),
                    poi.similarity_score(),
                    poi.rating,
                    bearing,
                );

                let differs = last_category
                    .as_ref()
                    .map(|c| poi.category != *c)
                    .unwrap_or(true);
                qualified.push((Scored { index: i, score }, differs));
            }

            if qualified.is_empty() {
                continue;
            }

            // Interleaving applies to the closing pair too, with the same
            // empty-pool exception.
            let interleaved: Vec<Scored> = qualified
                .iter()
                .filter(|(_, differs)| *differs)
                .map(|(s, _)| Scored {
                    index: s.index,
                    score: s.score,
                })
                .collect();
            let pool = if interleaved.is_empty() {
                qualified.into_iter().map(|(s, _)| s).collect()
            } else {
                interleaved
            };

            if let Some(best) = self.pick_best(pool) {
                tracing::debug!(rho = rho, "Closing stop found");
                if self.input.meal_anchor
                    && self.input.pool[best.index].category == PoiCategory::Restaurant
                {
                    st.restaurant_inserted = true;
                }
                return Some(best);
            }
        }

        None
    }

    fn push_stop(&self, st: &mut RouteState, selected: Scored) {
        let here = self.position_coords(st.pos);
        let poi = &self.input.pool[selected.index];

        let travel = self.travel_minutes(self.matrix[st.pos][selected.index + 1]);
        let stay = self.config.default_stay_minutes;

        st.prev_bearing = Some(geo::initial_bearing(&here, &poi.coordinates()));
        st.travel_minutes += travel;
        st.stay_minutes += stay;
        st.visited.insert(selected.index);
        st.pos = selected.index + 1;
        st.stops.push(BuiltStop {
            pool_index: selected.index,
            travel_minutes: travel,
            stay_minutes: stay,
            combined_score: selected.score,
        });
    }

    /// Strict score comparison; ties broken by similarity desc, rating desc,
    /// id asc.
    fn pick_best(&self, candidates: Vec<Scored>) -> Option<Scored> {
        candidates.into_iter().reduce(|best, c| {
            let a = &self.input.pool[c.index];
            let b = &self.input.pool[best.index];
            let better = if c.score != best.score {
                c.score > best.score
            } else if a.similarity_score() != b.similarity_score() {
                a.similarity_score() > b.similarity_score()
            } else if a.rating != b.rating {
                a.rating > b.rating
            } else {
                a.id < b.id
            };
            if better {
                c
            } else {
                best
            }
        })
    }

    /// Leg to the candidate + its stay + the estimated return to the user
    /// must still fit inside the budget.
    fn fits_budget(&self, pos: usize, travel_so_far: f64, stay_so_far: f64, candidate: usize) -> bool {
        let leg = self.travel_minutes(self.matrix[pos][candidate + 1]);
        let estimated_return = self.travel_minutes(self.matrix[candidate + 1][0]);
        travel_so_far + leg + stay_so_far + self.config.default_stay_minutes + estimated_return
            <= self.input.max_time_minutes
    }

    fn travel_minutes(&self, meters: f64) -> f64 {
        self.input.mode.travel_minutes(meters)
    }

    fn position_coords(&self, pos: usize) -> Coordinates {
        if pos == 0 {
            self.input.user
        } else {
            self.input.pool[pos - 1].coordinates()
        }
    }

    fn arrival_at(&self, elapsed_minutes: f64, travel_minutes: f64) -> Option<NaiveDateTime> {
        self.input
            .current_time
            .map(|t| t + Duration::seconds(((elapsed_minutes + travel_minutes) * 60.0) as i64))
    }

    fn in_meal_window(&self, t: NaiveDateTime) -> bool {
        self.input
            .meal_windows
            .iter()
            .any(|(start, end)| *start <= t && t <= *end)
    }

    fn open_at_offset(&self, index: usize, offset_minutes: f64) -> bool {
        match self.arrival_at(offset_minutes, 0.0) {
            Some(arrival) => self.input.pool[index].open_hours.is_open_at(arrival),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayHours, OpeningHours, TimeRange};

    fn poi(id: &str, category: PoiCategory, lat: f64, lon: f64, similarity: f64) -> Poi {
        Poi {
            id: id.to_string(),
            name: format!("POI {}", id),
            category,
            lat,
            lon,
            address: String::new(),
            rating: 0.7,
            open_hours: OpeningHours::default(),
            similarity: Some(similarity),
            distance_meters: None,
        }
    }

    fn user() -> Coordinates {
        Coordinates::new(10.80, 106.77).unwrap()
    }

    /// Offset in kilometers north/east of the user.
    fn offset(north_km: f64, east_km: f64) -> (f64, f64) {
        let lat = 10.80 + north_km / 111.0;
        let lon = 106.77 + east_km / (111.0 * (10.80_f64).to_radians().cos());
        (lat, lon)
    }

    fn input(pool: Vec<Poi>, target: usize, max_routes: usize) -> PlannerInput {
        PlannerInput {
            user: user(),
            pool,
            mode: TransportMode::Walking,
            max_time_minutes: 600.0,
            target_places: target,
            max_routes,
            current_time: None,
            meal_anchor: false,
            meal_windows: vec![],
        }
    }

    fn zigzag_config() -> PlannerConfig {
        PlannerConfig {
            use_circular_routing: false,
            ..PlannerConfig::default()
        }
    }

    fn mixed_pool() -> Vec<Poi> {
        let mut pool = Vec::new();
        let categories = [
            PoiCategory::CultureHeritage,
            PoiCategory::NatureView,
            PoiCategory::Entertainment,
        ];
        for i in 0..9 {
            let (lat, lon) = offset(0.2 + 0.1 * i as f64, 0.15 * i as f64);
            pool.push(poi(
                &format!("p{}", i),
                categories[i % 3].clone(),
                lat,
                lon,
                0.9 - 0.05 * i as f64,
            ));
        }
        pool
    }

    #[test]
    fn zero_budget_builds_no_routes() {
        let mut inp = input(mixed_pool(), 4, 3);
        inp.max_time_minutes = 0.0;
        assert!(build_routes(&inp, &zigzag_config()).is_empty());
    }

    #[test]
    fn empty_pool_builds_no_routes() {
        let inp = input(vec![], 4, 3);
        assert!(build_routes(&inp, &zigzag_config()).is_empty());
    }

    #[test]
    fn pool_smaller_than_target_truncates() {
        let (lat, lon) = offset(0.5, 0.0);
        let (lat2, lon2) = offset(0.0, 0.5);
        let pool = vec![
            poi("a", PoiCategory::CultureHeritage, lat, lon, 0.9),
            poi("b", PoiCategory::NatureView, lat2, lon2, 0.8),
        ];
        let inp = input(pool, 5, 1);
        let routes = build_routes(&inp, &zigzag_config());
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].stops.len(), 2);
    }

    #[test]
    fn single_stop_route_skips_closing_rules() {
        let inp = input(mixed_pool(), 1, 1);
        let routes = build_routes(&inp, &zigzag_config());
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].stops.len(), 1);
    }

    #[test]
    fn totals_are_consistent() {
        let inp = input(mixed_pool(), 4, 2);
        let routes = build_routes(&inp, &zigzag_config());
        assert!(!routes.is_empty());
        for route in &routes {
            let leg_sum: f64 = route.stops.iter().map(|s| s.travel_minutes).sum();
            let stay_sum: f64 = route.stops.iter().map(|s| s.stay_minutes).sum();
            // travel includes the return leg, so it is at least the leg sum
            assert!(route.travel_minutes >= leg_sum - 1e-6);
            assert!((route.stay_minutes - stay_sum).abs() < 1e-6);
            assert!(
                (route.total_minutes - route.travel_minutes - route.stay_minutes).abs() < 1e-6
            );
            assert!(route.total_minutes <= inp.max_time_minutes + 1e-6);
        }
    }

    #[test]
    fn consecutive_categories_differ_when_possible() {
        let inp = input(mixed_pool(), 5, 1);
        let routes = build_routes(&inp, &zigzag_config());
        let route = &routes[0];
        for pair in route.stops.windows(2) {
            let a = &inp.pool[pair[0].pool_index].category;
            let b = &inp.pool[pair[1].pool_index].category;
            assert_ne!(a, b, "consecutive stops share category");
        }
    }

    #[test]
    fn single_category_pool_still_builds() {
        let mut pool = Vec::new();
        for i in 0..5 {
            let (lat, lon) = offset(0.3 + 0.2 * i as f64, 0.1 * i as f64);
            pool.push(poi(&format!("c{}", i), PoiCategory::CafeBakery, lat, lon, 0.8));
        }
        let inp = input(pool, 4, 1);
        let routes = build_routes(&inp, &zigzag_config());
        // the no-repeat rule yields to an empty other-category pool
        assert_eq!(routes[0].stops.len(), 4);
    }

    #[test]
    fn routes_are_disjoint_until_pool_runs_out() {
        let inp = input(mixed_pool(), 3, 3);
        let routes = build_routes(&inp, &zigzag_config());
        assert_eq!(routes.len(), 3);

        let mut seen = HashSet::new();
        for route in &routes {
            for stop in &route.stops {
                assert!(seen.insert(stop.pool_index), "POI repeated across routes");
            }
        }
    }

    #[test]
    fn exhausted_pool_allows_repetition_with_warning() {
        // 3 POIs, 3-stop routes: the second route must reuse stops
        let pool = mixed_pool().into_iter().take(3).collect::<Vec<_>>();
        let inp = input(pool, 3, 2);
        let routes = build_routes(&inp, &zigzag_config());
        assert_eq!(routes.len(), 2);
        assert!(routes[1]
            .warnings
            .iter()
            .any(|w| w.contains("pool exhausted")));
    }

    #[test]
    fn tight_budget_truncates_route() {
        let inp = PlannerInput {
            // ~65 minutes of walking + 2 stays fit, a third stop does not
            max_time_minutes: 120.0,
            ..input(mixed_pool(), 5, 1)
        };
        let routes = build_routes(&inp, &zigzag_config());
        assert_eq!(routes.len(), 1);
        assert!(routes[0].stops.len() < 5);
        assert!(routes[0].total_minutes <= 120.0 + 1e-6);
    }

    #[test]
    fn closed_pool_relaxes_hours_filter() {
        let closed = OpeningHours(vec![DayHours {
            day: "Thursday".to_string(),
            hours: vec![TimeRange {
                start: "08:00".to_string(),
                end: "09:00".to_string(),
            }],
        }]);
        let mut pool = mixed_pool();
        for p in &mut pool {
            p.open_hours = closed.clone();
        }

        let mut inp = input(pool, 3, 1);
        // Thursday noon: every POI closed
        inp.current_time =
            Some(NaiveDateTime::parse_from_str("2026-02-05T12:00:00", "%Y-%m-%dT%H:%M:%S").unwrap());

        let routes = build_routes(&inp, &zigzag_config());
        assert_eq!(routes.len(), 1, "relaxation should still produce a route");
        assert!(routes[0]
            .warnings
            .iter()
            .any(|w| w.contains("opening-hours filter relaxed")));
    }

    #[test]
    fn meal_anchor_inserts_exactly_one_restaurant() {
        let mut pool = mixed_pool();
        for i in 0..3 {
            let (lat, lon) = offset(0.4, 0.3 + 0.2 * i as f64);
            pool.push(poi(&format!("r{}", i), PoiCategory::Restaurant, lat, lon, 0.85));
        }

        let start =
            NaiveDateTime::parse_from_str("2026-02-05T11:00:00", "%Y-%m-%dT%H:%M:%S").unwrap();
        let lunch = (
            NaiveDateTime::parse_from_str("2026-02-05T11:30:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
            NaiveDateTime::parse_from_str("2026-02-05T13:30:00", "%Y-%m-%dT%H:%M:%S").unwrap(),
        );

        let inp = PlannerInput {
            current_time: Some(start),
            meal_anchor: true,
            meal_windows: vec![lunch],
            max_time_minutes: 240.0,
            ..input(pool, 5, 1)
        };

        let routes = build_routes(&inp, &zigzag_config());
        assert_eq!(routes.len(), 1);
        let restaurants = routes[0]
            .stops
            .iter()
            .filter(|s| inp.pool[s.pool_index].category == PoiCategory::Restaurant)
            .count();
        assert_eq!(restaurants, 1, "exactly one meal-anchored Restaurant");
    }

    #[test]
    fn direction_lock_reports_in_route() {
        let mut pool = Vec::new();
        // ring of POIs around the user
        for i in 0..8 {
            let angle = (i as f64) * std::f64::consts::FRAC_PI_4;
            let (lat, lon) = offset(angle.cos(), angle.sin());
            let categories = [PoiCategory::CultureHeritage, PoiCategory::NatureView];
            pool.push(poi(&format!("ring{}", i), categories[i % 2].clone(), lat, lon, 0.8));
        }
        let inp = input(pool, 4, 1);
        let config = PlannerConfig {
            use_circular_routing: true,
            circular_direction_preference: crate::config::DirectionPreference::Right,
            ..PlannerConfig::default()
        };
        let routes = build_routes(&inp, &config);
        assert_eq!(routes[0].direction, Some(TurnDirection::Right));
    }
}
