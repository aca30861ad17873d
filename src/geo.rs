//! Great-circle geometry used by candidate search and route construction.
//! Distances are meters, bearings compass degrees clockwise from north.

use crate::models::Coordinates;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine great-circle distance in meters.
pub fn haversine_m(a: &Coordinates, b: &Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial bearing from `a` to `b` in degrees, normalized to [0, 360).
/// 0 = north, 90 = east, 180 = south, 270 = west.
pub fn initial_bearing(a: &Coordinates, b: &Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let x = dlon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Absolute angular difference between two bearings, in [0, 180].
pub fn bearing_diff(b1: f64, b2: f64) -> f64 {
    let d = (b1 - b2).abs() % 360.0;
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Straight-line continuation score: 1.0 at 0 degrees, 0.0 at 180.
pub fn zigzag_score(prev_bearing: f64, next_bearing: f64) -> f64 {
    1.0 - bearing_diff(prev_bearing, next_bearing) / 180.0
}

/// Right-angle turn score: 1.0 at 90 degrees, 0.0 at 0 or 180.
pub fn circular_score(prev_bearing: f64, next_bearing: f64) -> f64 {
    let d = bearing_diff(prev_bearing, next_bearing);
    1.0 - (d - 90.0).abs() / 90.0
}

/// Symmetric (n+1) x (n+1) distance matrix in meters, index 0 = user.
pub fn distance_matrix(user: &Coordinates, points: &[Coordinates]) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut matrix = vec![vec![0.0; n + 1]; n + 1];

    let mut coords = Vec::with_capacity(n + 1);
    coords.push(*user);
    coords.extend_from_slice(points);

    for i in 0..=n {
        for j in (i + 1)..=n {
            let d = haversine_m(&coords[i], &coords[j]);
            matrix[i][j] = d;
            matrix[j][i] = d;
        }
    }

    matrix
}
