use crate::constants::*;
use chrono::NaiveTime;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectionPreference {
    Right,
    Left,
    #[default]
    Auto,
}

impl std::str::FromStr for DirectionPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "right" => Ok(DirectionPreference::Right),
            "left" => Ok(DirectionPreference::Left),
            "auto" => Ok(DirectionPreference::Auto),
            _ => Err(format!(
                "Invalid direction preference: {}. Use 'right', 'left' or 'auto'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub embedding_url: String,
    pub vector_index_url: String,
    pub vector_collection: String,
    pub user_cache_ttl: u64,
    pub cell_cache_ttl: u64,
    pub planner: PlannerConfig,
}

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// H3 resolution for the spatial cell cache
    pub h3_resolution: u8,

    /// Prefer ~90-degree turns over straight-line continuation
    pub use_circular_routing: bool,

    /// Half-width of the turn cone around +/-90 degrees
    pub circular_angle_tolerance_deg: f64,

    /// Turn direction committed per route
    pub circular_direction_preference: DirectionPreference,

    /// Minutes spent at each stop unless a category overrides it
    pub default_stay_minutes: f64,

    pub lunch_window: (NaiveTime, NaiveTime),
    pub dinner_window: (NaiveTime, NaiveTime),

    /// Widen the spatial k-ring until this many candidates are found
    pub max_candidates_floor: usize,
    pub progressive_expansion: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            h3_resolution: DEFAULT_H3_RESOLUTION,
            use_circular_routing: true,
            circular_angle_tolerance_deg: 10.0,
            circular_direction_preference: DirectionPreference::Auto,
            default_stay_minutes: DEFAULT_STAY_MINUTES,
            lunch_window: (
                NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
                NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
            ),
            dinner_window: (
                NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            ),
            max_candidates_floor: MAX_CANDIDATES_FLOOR,
            progressive_expansion: true,
        }
    }
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let lunch_window = parse_window_var("LUNCH_WINDOW", defaults.lunch_window)?;
        let dinner_window = parse_window_var("DINNER_WINDOW", defaults.dinner_window)?;

        Ok(Self {
            h3_resolution: env::var("H3_RESOLUTION")
                .unwrap_or_else(|_| defaults.h3_resolution.to_string())
                .parse()
                .map_err(|_| "Invalid H3_RESOLUTION")?,

            use_circular_routing: env::var("USE_CIRCULAR_ROUTING")
                .unwrap_or_else(|_| defaults.use_circular_routing.to_string())
                .parse()
                .map_err(|_| "Invalid USE_CIRCULAR_ROUTING")?,

            circular_angle_tolerance_deg: env::var("CIRCULAR_ANGLE_TOLERANCE")
                .unwrap_or_else(|_| defaults.circular_angle_tolerance_deg.to_string())
                .parse()
                .map_err(|_| "Invalid CIRCULAR_ANGLE_TOLERANCE")?,

            circular_direction_preference: env::var("CIRCULAR_DIRECTION_PREFERENCE")
                .unwrap_or_else(|_| "auto".to_string())
                .parse()?,

            default_stay_minutes: env::var("DEFAULT_STAY_MINUTES")
                .unwrap_or_else(|_| defaults.default_stay_minutes.to_string())
                .parse()
                .map_err(|_| "Invalid DEFAULT_STAY_MINUTES")?,

            lunch_window,
            dinner_window,

            max_candidates_floor: env::var("MAX_CANDIDATES_FLOOR")
                .unwrap_or_else(|_| defaults.max_candidates_floor.to_string())
                .parse()
                .map_err(|_| "Invalid MAX_CANDIDATES_FLOOR")?,

            progressive_expansion: env::var("PROGRESSIVE_EXPANSION")
                .unwrap_or_else(|_| defaults.progressive_expansion.to_string())
                .parse()
                .map_err(|_| "Invalid PROGRESSIVE_EXPANSION")?,
        })
    }
}

/// Parse "HH:MM-HH:MM" into a (start, end) window.
fn parse_window_var(
    name: &str,
    default: (NaiveTime, NaiveTime),
) -> Result<(NaiveTime, NaiveTime), String> {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return Ok(default),
    };

    let (start, end) = raw
        .split_once('-')
        .ok_or_else(|| format!("Invalid {}: expected HH:MM-HH:MM", name))?;
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M")
        .map_err(|_| format!("Invalid {} start time", name))?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M")
        .map_err(|_| format!("Invalid {} end time", name))?;

    if end <= start {
        return Err(format!("Invalid {}: window end must be after start", name));
    }
    Ok((start, end))
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| "Invalid PORT")?,
            database_url: env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL").ok(),
            embedding_url: env::var("EMBEDDING_URL").map_err(|_| "EMBEDDING_URL must be set")?,
            vector_index_url: env::var("VECTOR_INDEX_URL")
                .map_err(|_| "VECTOR_INDEX_URL must be set")?,
            vector_collection: env::var("VECTOR_COLLECTION")
                .unwrap_or_else(|_| "poi_descriptions".to_string()),
            user_cache_ttl: env::var("USER_CACHE_TTL")
                .unwrap_or_else(|_| DEFAULT_USER_CACHE_TTL_SECONDS.to_string())
                .parse()
                .map_err(|_| "Invalid USER_CACHE_TTL")?,
            cell_cache_ttl: env::var("CELL_CACHE_TTL")
                .unwrap_or_else(|_| DEFAULT_CELL_CACHE_TTL_SECONDS.to_string())
                .parse()
                .map_err(|_| "Invalid CELL_CACHE_TTL")?,
            planner: PlannerConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
