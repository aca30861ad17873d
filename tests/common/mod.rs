#![allow(dead_code)]

use chrono::NaiveDateTime;
use wayfinder::models::{Coordinates, DayHours, OpeningHours, Poi, PoiCategory, TimeRange};

pub const USER_LAT: f64 = 10.80;
pub const USER_LON: f64 = 106.77;

pub fn user() -> Coordinates {
    Coordinates::new(USER_LAT, USER_LON).unwrap()
}

/// A point offset from the user by kilometers north/east.
pub fn offset_km(north_km: f64, east_km: f64) -> (f64, f64) {
    let lat = USER_LAT + north_km / 111.0;
    let lon = USER_LON + east_km / (111.0 * USER_LAT.to_radians().cos());
    (lat, lon)
}

pub fn poi(id: &str, category: PoiCategory, lat: f64, lon: f64) -> Poi {
    Poi {
        id: id.to_string(),
        name: format!("POI {}", id),
        category,
        lat,
        lon,
        address: String::new(),
        rating: 0.7,
        open_hours: OpeningHours::default(),
        similarity: Some(0.8),
        distance_meters: None,
    }
}

pub fn hours(day: &str, start: &str, end: &str) -> OpeningHours {
    OpeningHours(vec![DayHours {
        day: day.to_string(),
        hours: vec![TimeRange {
            start: start.to_string(),
            end: end.to_string(),
        }],
    }])
}

pub fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
}
