use crate::models::{Coordinates, OpeningHours};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Primary POI category. The vocabulary is fixed by the ingestion pipeline;
/// anything outside it is carried verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoiCategory {
    Restaurant,
    CafeBakery,
    CultureHeritage,
    NatureView,
    Entertainment,
    Shopping,
    Bar,
    Other(String),
}

impl fmt::Display for PoiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoiCategory::Restaurant => "Restaurant",
            PoiCategory::CafeBakery => "Cafe & Bakery",
            PoiCategory::CultureHeritage => "Culture & heritage",
            PoiCategory::NatureView => "Nature & View",
            PoiCategory::Entertainment => "Entertainment",
            PoiCategory::Shopping => "Shopping",
            PoiCategory::Bar => "Bar",
            PoiCategory::Other(other) => other.as_str(),
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PoiCategory {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_lowercase().as_str() {
            "restaurant" => PoiCategory::Restaurant,
            "cafe & bakery" => PoiCategory::CafeBakery,
            "culture & heritage" => PoiCategory::CultureHeritage,
            "nature & view" => PoiCategory::NatureView,
            "entertainment" => PoiCategory::Entertainment,
            "shopping" => PoiCategory::Shopping,
            "bar" => PoiCategory::Bar,
            _ => PoiCategory::Other(trimmed.to_string()),
        })
    }
}

// Categories travel as their display strings in JSON, cache values and the
// vector-index payload.
impl Serialize for PoiCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PoiCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Fully hydrated POI record as read from the store, optionally annotated
/// with a similarity score and a distance from the search center.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poi {
    pub id: String,
    pub name: String,
    pub category: PoiCategory,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub address: String,
    /// Normalized review score in [0, 1]
    pub rating: f64,
    #[serde(default)]
    pub open_hours: OpeningHours,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

impl Poi {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lon: self.lon,
        }
    }

    /// Similarity carried from the last search pass, neutral when absent.
    pub fn similarity_score(&self) -> f64 {
        self.similarity.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_display_roundtrip() {
        for name in [
            "Restaurant",
            "Cafe & Bakery",
            "Culture & heritage",
            "Nature & View",
            "Entertainment",
            "Shopping",
            "Bar",
        ] {
            let cat: PoiCategory = name.parse().unwrap();
            assert_eq!(cat.to_string(), name);
        }
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(
            "RESTAURANT".parse::<PoiCategory>().unwrap(),
            PoiCategory::Restaurant
        );
        assert_eq!(
            "cafe & bakery".parse::<PoiCategory>().unwrap(),
            PoiCategory::CafeBakery
        );
    }

    #[test]
    fn unknown_category_preserved() {
        let cat: PoiCategory = "Night Market".parse().unwrap();
        assert_eq!(cat, PoiCategory::Other("Night Market".to_string()));
        assert_eq!(cat.to_string(), "Night Market");
    }

    #[test]
    fn category_serde_as_string() {
        let json = serde_json::to_string(&PoiCategory::CultureHeritage).unwrap();
        assert_eq!(json, "\"Culture & heritage\"");
        let back: PoiCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PoiCategory::CultureHeritage);
    }

    #[test]
    fn poi_serde_skips_absent_annotations() {
        let poi = Poi {
            id: "p1".to_string(),
            name: "War Remnants Museum".to_string(),
            category: PoiCategory::CultureHeritage,
            lat: 10.7794,
            lon: 106.6926,
            address: "28 Vo Van Tan".to_string(),
            rating: 0.91,
            open_hours: OpeningHours::default(),
            similarity: None,
            distance_meters: None,
        };
        let json = serde_json::to_string(&poi).unwrap();
        assert!(!json.contains("similarity"));
        assert!(!json.contains("distance_meters"));
    }
}
