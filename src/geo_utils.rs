//! Geographic utilities shared by the kernel and the aggregators.
//!
//! Everything here works on a sphere of mean radius [`EARTH_RADIUS_KM`], so
//! distances and areas produced by the crate stay in consistent units.

use geo::{Distance, Haversine, Point};

use crate::Coordinate;

/// Mean Earth radius in kilometers (IUGG), the same sphere `geo` uses for haversine.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Length of one degree of latitude (or of longitude at the equator) in kilometers.
pub const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

/// Great-circle distance between two coordinates in kilometers.
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let p1 = Point::new(a.lon, a.lat);
    let p2 = Point::new(b.lon, b.lat);
    Haversine::distance(p1, p2) / 1000.0
}

/// Convert a north-south distance in kilometers to degrees of latitude.
pub fn km_to_degrees_lat(km: f64) -> f64 {
    km / KM_PER_DEGREE
}

/// Convert an east-west distance in kilometers to degrees of longitude at `lat`.
///
/// Returns `None` at (or numerically next to) the poles where a longitude
/// span no longer bounds the distance.
pub fn km_to_degrees_lon(km: f64, lat: f64) -> Option<f64> {
    let cos_lat = lat.to_radians().cos();
    if cos_lat <= 1e-9 {
        return None;
    }
    Some(km / (KM_PER_DEGREE * cos_lat))
}

/// Project `coord` into a local equirectangular plane centred on `origin`.
///
/// Returns `(x, y)` in kilometers east and north of the origin. The map is
/// affine in (lon, lat), so straight lon/lat edges stay straight.
pub fn project_local(origin: &Coordinate, coord: &Coordinate) -> (f64, f64) {
    let scale = origin.lat.to_radians().cos();
    (
        (coord.lon - origin.lon) * scale * KM_PER_DEGREE,
        (coord.lat - origin.lat) * KM_PER_DEGREE,
    )
}

/// Total length of a vertex sequence in kilometers.
pub fn polyline_length_km(vertices: &[Coordinate]) -> f64 {
    vertices
        .windows(2)
        .map(|w| haversine_km(&w[0], &w[1]))
        .sum()
}

/// Round to three decimal places (the precision of published trail scores).
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
