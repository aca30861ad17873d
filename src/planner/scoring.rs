//! Position-dependent stop scoring. Scores combine proximity, semantic
//! similarity, review rating and (for middle stops) a bearing term that
//! rewards either straight-line continuation or right-angle turns.

use crate::geo;

#[derive(Debug, Clone, Copy)]
pub struct Weights {
    pub distance: f64,
    pub similarity: f64,
    pub rating: f64,
    pub bearing: f64,
}

pub const FIRST_STOP_WEIGHTS: Weights = Weights {
    distance: 0.10,
    similarity: 0.45,
    rating: 0.45,
    bearing: 0.0,
};

/// Middle stop, zigzag mode, similarity at or above the high threshold.
pub const MIDDLE_HIGH_SIM_WEIGHTS: Weights = Weights {
    distance: 0.15,
    similarity: 0.50,
    rating: 0.30,
    bearing: 0.05,
};

/// Middle stop, zigzag mode, similarity below the high threshold.
pub const MIDDLE_LOW_SIM_WEIGHTS: Weights = Weights {
    distance: 0.25,
    similarity: 0.10,
    rating: 0.40,
    bearing: 0.25,
};

/// Middle stop when circular routing is enabled: the turn term dominates.
pub const MIDDLE_CIRCULAR_WEIGHTS: Weights = Weights {
    distance: 0.30,
    similarity: 0.10,
    rating: 0.20,
    bearing: 0.40,
};

pub const LAST_STOP_WEIGHTS: Weights = Weights {
    distance: 0.40,
    similarity: 0.30,
    rating: 0.30,
    bearing: 0.0,
};

pub const LAST_STOP_CIRCULAR_WEIGHTS: Weights = Weights {
    distance: 0.40,
    similarity: 0.10,
    rating: 0.20,
    bearing: 0.30,
};

pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Widening thresholds (fractions of the pool's max radius) for the
/// closing-stop search.
pub const CLOSING_RADIUS_STEPS: [f64; 5] = [0.2, 0.4, 0.6, 0.8, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPosition {
    First,
    Middle,
    Last,
}

pub fn weights_for(position: StopPosition, circular: bool, similarity: f64) -> Weights {
    match position {
        StopPosition::First => FIRST_STOP_WEIGHTS,
        StopPosition::Last => {
            if circular {
                LAST_STOP_CIRCULAR_WEIGHTS
            } else {
                LAST_STOP_WEIGHTS
            }
        }
        StopPosition::Middle => {
            if circular {
                MIDDLE_CIRCULAR_WEIGHTS
            } else if similarity >= SIMILARITY_THRESHOLD {
                MIDDLE_HIGH_SIM_WEIGHTS
            } else {
                MIDDLE_LOW_SIM_WEIGHTS
            }
        }
    }
}

/// `1 - clamp(d / r_max)`: 1.0 at the user, 0.0 at or beyond the mode radius.
pub fn distance_score(distance_m: f64, r_max_m: f64) -> f64 {
    if r_max_m <= 0.0 {
        return 0.0;
    }
    1.0 - (distance_m / r_max_m).clamp(0.0, 1.0)
}

/// Bearing term for a middle/closing leg, by routing discipline.
pub fn bearing_score(prev_bearing: f64, next_bearing: f64, circular: bool) -> f64 {
    if circular {
        geo::circular_score(prev_bearing, next_bearing)
    } else {
        geo::zigzag_score(prev_bearing, next_bearing)
    }
}

pub fn combined_score(
    weights: &Weights,
    distance_score: f64,
    similarity: f64,
    rating: f64,
    bearing_score: f64,
) -> f64 {
    weights.distance * distance_score
        + weights.similarity * similarity
        + weights.rating * rating
        + weights.bearing * bearing_score
}
