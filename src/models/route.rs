use crate::models::{Coordinates, DaySummary, PoiCategory};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::constants::{
    DEFAULT_MAX_ROUTES, DEFAULT_MAX_TIME_MINUTES, DEFAULT_REPLACEMENT_TOP_K,
    DEFAULT_TARGET_PLACES, DEFAULT_TOP_K_SEMANTIC,
};

/// Closed set of travel modes. Each fixes an average speed used to turn
/// great-circle distance into minutes, the k-ring used by the spatial
/// candidate search, and the nominal search radius.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportMode {
    #[default]
    Walking,
    Bicycling,
    Transit,
    Flexible,
    Driving,
}

impl TransportMode {
    pub fn speed_kmh(&self) -> f64 {
        match self {
            TransportMode::Walking => 5.0,
            TransportMode::Bicycling => 15.0,
            TransportMode::Transit => 25.0,
            TransportMode::Flexible => 30.0,
            TransportMode::Driving => 40.0,
        }
    }

    /// Nominal candidate radius in meters; also R_max for distance scoring.
    pub fn radius_m(&self) -> f64 {
        match self {
            TransportMode::Walking => 2_000.0,
            TransportMode::Bicycling => 4_000.0,
            TransportMode::Transit => 6_000.0,
            TransportMode::Flexible => 8_000.0,
            TransportMode::Driving => 10_000.0,
        }
    }

    /// H3 k-ring sized so the ring coverage encloses `radius_m` at the
    /// configured resolution.
    pub fn k_ring(&self) -> u32 {
        match self {
            TransportMode::Walking => 8,
            TransportMode::Bicycling => 16,
            TransportMode::Transit => 23,
            TransportMode::Flexible => 31,
            TransportMode::Driving => 39,
        }
    }

    /// Great-circle meters to travel minutes at the mode's average speed.
    pub fn travel_minutes(&self, meters: f64) -> f64 {
        (meters / 1000.0) / self.speed_kmh() * 60.0
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportMode::Walking => "WALKING",
            TransportMode::Bicycling => "BICYCLING",
            TransportMode::Transit => "TRANSIT",
            TransportMode::Flexible => "FLEXIBLE",
            TransportMode::Driving => "DRIVING",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WALKING" => Ok(TransportMode::Walking),
            "BICYCLING" => Ok(TransportMode::Bicycling),
            "TRANSIT" => Ok(TransportMode::Transit),
            "FLEXIBLE" => Ok(TransportMode::Flexible),
            "DRIVING" => Ok(TransportMode::Driving),
            _ => Err(format!("Invalid transportation mode: '{}'", s)),
        }
    }
}

/// One stop of a built route, annotated for the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStop {
    pub poi_id: String,
    pub name: String,
    pub category: PoiCategory,
    #[serde(default)]
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    /// 1-based visiting order
    pub order: u32,
    pub similarity: f64,
    pub rating: f64,
    pub combined_score: f64,
    pub travel_time_minutes: f64,
    pub stay_time_minutes: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours_today: Option<DaySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub route_id: u32,
    pub total_time_minutes: f64,
    pub travel_time_minutes: f64,
    pub stay_time_minutes: f64,
    pub total_score: f64,
    pub avg_score: f64,
    /// total_score / (total_time_minutes / 100)
    pub efficiency: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_valid_timing: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timing_warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub construction_warnings: Vec<String>,
    pub stops: Vec<RouteStop>,
}

// Request/Response types for the API surface

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRoutesRequest {
    pub user_id: Option<Uuid>,
    pub lat: f64,
    pub lon: f64,
    pub mode: TransportMode,
    pub query: String,
    pub current_time: Option<NaiveDateTime>,
    #[serde(default = "default_max_time")]
    pub max_time_minutes: f64,
    #[serde(default = "default_target_places")]
    pub target_places: usize,
    #[serde(default = "default_max_routes")]
    pub max_routes: usize,
    #[serde(default = "default_top_k_semantic")]
    pub top_k_semantic: usize,
    #[serde(default)]
    pub customer_like: bool,
    #[serde(default)]
    pub delete_cache: bool,
    pub replace_route: Option<u32>,
}

fn default_max_time() -> f64 {
    DEFAULT_MAX_TIME_MINUTES
}

fn default_target_places() -> usize {
    DEFAULT_TARGET_PLACES
}

fn default_max_routes() -> usize {
    DEFAULT_MAX_ROUTES
}

fn default_top_k_semantic() -> usize {
    DEFAULT_TOP_K_SEMANTIC
}

fn default_replacement_top_k() -> usize {
    DEFAULT_REPLACEMENT_TOP_K
}

impl SearchRoutesRequest {
    pub fn validate(&self) -> Result<(), String> {
        Coordinates::new(self.lat, self.lon)?;
        if self.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        if self.max_time_minutes < 0.0 {
            return Err("max_time_minutes must not be negative".to_string());
        }
        if self.target_places == 0 {
            return Err("target_places must be at least 1".to_string());
        }
        if self.max_routes == 0 {
            return Err("max_routes must be at least 1".to_string());
        }
        if self.top_k_semantic == 0 {
            return Err("top_k_semantic must be positive".to_string());
        }
        if self.replace_route == Some(0) {
            return Err("replace_route ids start at 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct TimingBreakdown {
    pub spatial_ms: u64,
    pub embedding_ms: u64,
    pub vector_search_ms: u64,
    pub db_hydration_ms: u64,
    pub build_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpatialInfo {
    pub radius_used_m: f64,
    pub total_spatial_candidates: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchRoutesResponse {
    pub routes: Vec<Route>,
    pub spatial_info: SpatialInfo,
    pub timing_breakdown: TimingBreakdown,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplacePoiRequest {
    pub user_id: Uuid,
    pub route_id: String,
    pub old_poi_id: String,
    pub user_location: Coordinates,
    pub mode: TransportMode,
    #[serde(default = "default_replacement_top_k")]
    pub top_k: usize,
    pub current_time: Option<NaiveDateTime>,
}

impl ReplacePoiRequest {
    pub fn validate(&self) -> Result<(), String> {
        Coordinates::new(self.user_location.lat, self.user_location.lon)?;
        if self.top_k == 0 {
            return Err("top_k must be positive".to_string());
        }
        Ok(())
    }
}

/// A ranked substitute for one stop, with the cost deltas of swapping it in.
#[derive(Debug, Clone, Serialize)]
pub struct ReplacementCandidate {
    #[serde(flatten)]
    pub poi: crate::models::Poi,
    pub replacement_score: f64,
    /// (new prev-leg + next-leg) minus (old prev-leg + next-leg), meters
    pub distance_delta_meters: f64,
    pub time_delta_minutes: f64,
}

#[derive(Debug, Serialize)]
pub struct ReplacePoiResponse {
    pub candidates: Vec<ReplacementCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmReplaceRequest {
    pub user_id: Uuid,
    pub route_id: String,
    pub old_poi_id: String,
    pub new_poi_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceFullRouteRequest {
    pub user_id: Uuid,
    pub route_id: String,
    pub new_query: String,
    pub user_location: Coordinates,
    pub mode: TransportMode,
    #[serde(default = "default_max_time")]
    pub max_time_minutes: f64,
    #[serde(default = "default_target_places")]
    pub target_places: usize,
    pub current_time: Option<NaiveDateTime>,
}

impl ReplaceFullRouteRequest {
    pub fn validate(&self) -> Result<(), String> {
        Coordinates::new(self.user_location.lat, self.user_location.lon)?;
        if self.new_query.trim().is_empty() {
            return Err("new_query must not be empty".to_string());
        }
        if self.max_time_minutes < 0.0 {
            return Err("max_time_minutes must not be negative".to_string());
        }
        if self.target_places == 0 {
            return Err("target_places must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisitedPoisRequest {
    pub user_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_speed_table() {
        assert_eq!(TransportMode::Walking.speed_kmh(), 5.0);
        assert_eq!(TransportMode::Bicycling.speed_kmh(), 15.0);
        assert_eq!(TransportMode::Transit.speed_kmh(), 25.0);
        assert_eq!(TransportMode::Flexible.speed_kmh(), 30.0);
        assert_eq!(TransportMode::Driving.speed_kmh(), 40.0);
    }

    #[test]
    fn travel_minutes_conversion() {
        // 5 km at 5 km/h = 60 minutes
        assert!((TransportMode::Walking.travel_minutes(5_000.0) - 60.0).abs() < 1e-9);
        // 10 km at 40 km/h = 15 minutes
        assert!((TransportMode::Driving.travel_minutes(10_000.0) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn mode_from_str() {
        assert_eq!(
            "walking".parse::<TransportMode>().unwrap(),
            TransportMode::Walking
        );
        assert_eq!(
            "DRIVING".parse::<TransportMode>().unwrap(),
            TransportMode::Driving
        );
        assert!("TELEPORT".parse::<TransportMode>().is_err());
    }

    #[test]
    fn mode_serde_uppercase() {
        let json = serde_json::to_string(&TransportMode::Bicycling).unwrap();
        assert_eq!(json, "\"BICYCLING\"");
        let back: TransportMode = serde_json::from_str("\"TRANSIT\"").unwrap();
        assert_eq!(back, TransportMode::Transit);
    }

    fn base_request() -> SearchRoutesRequest {
        serde_json::from_str(
            r#"{
                "lat": 10.8019,
                "lon": 106.7713,
                "mode": "DRIVING",
                "query": "Culture & heritage"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn search_request_defaults() {
        let req = base_request();
        assert_eq!(req.max_time_minutes, 180.0);
        assert_eq!(req.target_places, 5);
        assert_eq!(req.max_routes, 3);
        assert_eq!(req.top_k_semantic, 10);
        assert!(!req.customer_like);
        assert!(!req.delete_cache);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn search_request_validation() {
        let mut req = base_request();
        req.lat = 95.0;
        assert!(req.validate().is_err());

        let mut req = base_request();
        req.query = "  ".to_string();
        assert!(req.validate().is_err());

        let mut req = base_request();
        req.max_time_minutes = -1.0;
        assert!(req.validate().is_err());

        // zero budget is allowed: it yields zero routes, not an error
        let mut req = base_request();
        req.max_time_minutes = 0.0;
        assert!(req.validate().is_ok());

        let mut req = base_request();
        req.top_k_semantic = 0;
        assert!(req.validate().is_err());

        let mut req = base_request();
        req.replace_route = Some(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn current_time_parses_iso() {
        let req: SearchRoutesRequest = serde_json::from_str(
            r#"{
                "lat": 10.8,
                "lon": 106.77,
                "mode": "WALKING",
                "query": "Nature & View",
                "current_time": "2026-02-05T11:00:00"
            }"#,
        )
        .unwrap();
        let t = req.current_time.unwrap();
        assert_eq!(t.format("%H:%M").to_string(), "11:00");
    }
}
