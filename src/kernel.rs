//! Geometry kernel: containment, distance and area primitives.
//!
//! All functions are pure. Conventions:
//! - Containment is planar over (lon, lat) with the even-odd rule. A point
//!   lying exactly on any ring edge (outer boundary or hole) is not contained.
//! - Distances are kilometers in a local equirectangular plane centred on the
//!   query point, so segment edges are straight in (lon, lat) just like the
//!   polygon edges used for containment.
//! - Areas are square kilometers on the sphere used by [`crate::geo_utils`]
//!   (Chamberlain–Duquette ring area).
//!
//! Malformed geometry never panics or loops: containment and distance return
//! [`SightlineError::InvalidGeometry`], area returns 0. Coordinates outside the
//! WGS84 range count as malformed.

use crate::error::{OptionExt, Result, SightlineError};
use crate::geo_utils::{project_local, EARTH_RADIUS_KM};
use crate::{Coordinate, Polygon, Polyline};

/// Minimum coordinates in a closed linear ring.
pub const MIN_RING_COORDS: usize = 4;

/// Minimum vertices in a polyline.
pub const MIN_POLYLINE_VERTICES: usize = 2;

/// Result of a nearest-point query against a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoint {
    /// Distance from the query point in kilometers
    pub distance_km: f64,
    /// Index of the closest segment (vertices `i` and `i + 1`)
    pub segment_index: usize,
    /// Closest location on that segment
    pub location: Coordinate,
}

/// Where a point sits relative to one ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RingPosition {
    Inside,
    Outside,
    Boundary,
}

// ============================================================================
// Validation
// ============================================================================

/// Check that a ring is closed, inside the WGS84 range and has at least
/// [`MIN_RING_COORDS`] coordinates.
pub fn validate_ring(ring: &[Coordinate], ring_index: usize) -> Result<()> {
    if ring.len() < MIN_RING_COORDS {
        return Err(SightlineError::invalid_geometry(format!(
            "ring {} has {} coordinates, minimum {} required",
            ring_index,
            ring.len(),
            MIN_RING_COORDS
        )));
    }
    if let Some(pos) = ring.iter().position(|c| !c.is_valid()) {
        return Err(SightlineError::invalid_geometry(format!(
            "ring {} has an invalid coordinate at position {}",
            ring_index, pos
        )));
    }
    if ring.first() != ring.last() {
        return Err(SightlineError::invalid_geometry(format!(
            "ring {} is not closed",
            ring_index
        )));
    }
    Ok(())
}

/// Check every ring of a polygon.
pub fn validate_polygon(polygon: &Polygon) -> Result<()> {
    if polygon.rings.is_empty() {
        return Err(SightlineError::invalid_geometry("polygon has no rings"));
    }
    polygon
        .rings
        .iter()
        .enumerate()
        .try_for_each(|(i, ring)| validate_ring(ring, i))
}

/// Check that a polyline has enough vertices, all inside the WGS84 range.
pub fn validate_polyline(polyline: &Polyline) -> Result<()> {
    if polyline.vertices.len() < MIN_POLYLINE_VERTICES {
        return Err(SightlineError::invalid_geometry(format!(
            "polyline has {} vertices, minimum {} required",
            polyline.vertices.len(),
            MIN_POLYLINE_VERTICES
        )));
    }
    if let Some(pos) = polyline.vertices.iter().position(|c| !c.is_valid()) {
        return Err(SightlineError::invalid_geometry(format!(
            "polyline has an invalid vertex at position {}",
            pos
        )));
    }
    Ok(())
}

// ============================================================================
// Containment
// ============================================================================

/// Test whether `point` lies inside `polygon`'s outer ring and outside every hole.
///
/// Points exactly on a ring edge are classified as outside.
///
/// # Example
/// ```
/// use sightline::{point_in_polygon, Coordinate, Polygon};
///
/// let square = Polygon::new(
///     vec![
///         Coordinate::new(0.0, 0.0),
///         Coordinate::new(1.0, 0.0),
///         Coordinate::new(1.0, 1.0),
///         Coordinate::new(0.0, 1.0),
///         Coordinate::new(0.0, 0.0),
///     ],
///     vec![],
/// );
/// assert_eq!(point_in_polygon(&Coordinate::new(0.5, 0.5), &square), Ok(true));
/// assert_eq!(point_in_polygon(&Coordinate::new(1.0, 0.5), &square), Ok(false));
/// ```
pub fn point_in_polygon(point: &Coordinate, polygon: &Polygon) -> Result<bool> {
    check_query_point(point)?;
    validate_polygon(polygon)?;
    Ok(contains_validated(point, polygon))
}

/// Containment for a polygon that already passed [`validate_polygon`].
pub(crate) fn contains_validated(point: &Coordinate, polygon: &Polygon) -> bool {
    if ring_position(point, polygon.exterior()) != RingPosition::Inside {
        return false;
    }
    polygon
        .holes()
        .iter()
        .all(|hole| ring_position(point, hole) == RingPosition::Outside)
}

/// Even-odd ray cast towards +lon, with an exact on-edge check.
fn ring_position(point: &Coordinate, ring: &[Coordinate]) -> RingPosition {
    let mut inside = false;

    for edge in ring.windows(2) {
        let (a, b) = (&edge[0], &edge[1]);

        if on_segment(point, a, b) {
            return RingPosition::Boundary;
        }

        // Half-open rule on latitude so a vertex shared by two edges counts once
        if (a.lat > point.lat) != (b.lat > point.lat) {
            let crossing_lon = a.lon + (point.lat - a.lat) * (b.lon - a.lon) / (b.lat - a.lat);
            if point.lon < crossing_lon {
                inside = !inside;
            }
        }
    }

    if inside {
        RingPosition::Inside
    } else {
        RingPosition::Outside
    }
}

/// Relative tolerance on the cross product, scaled by the squared edge length.
const ON_EDGE_TOLERANCE: f64 = 1e-12;

fn on_segment(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> bool {
    let (dx, dy) = (b.lon - a.lon, b.lat - a.lat);
    let cross = dx * (p.lat - a.lat) - dy * (p.lon - a.lon);
    cross.abs() <= ON_EDGE_TOLERANCE * (dx * dx + dy * dy)
        && p.lon >= a.lon.min(b.lon)
        && p.lon <= a.lon.max(b.lon)
        && p.lat >= a.lat.min(b.lat)
        && p.lat <= a.lat.max(b.lat)
}

// ============================================================================
// Distance
// ============================================================================

/// Distance in kilometers from `point` to the segment `[a, b]`.
///
/// A degenerate segment (`a == b`) is treated as a single point.
pub fn distance_point_to_segment(
    point: &Coordinate,
    a: &Coordinate,
    b: &Coordinate,
) -> Result<f64> {
    if !(point.is_valid() && a.is_valid() && b.is_valid()) {
        return Err(SightlineError::invalid_geometry(
            "segment distance requires coordinates inside the WGS84 range",
        ));
    }
    Ok(project_onto_segment(point, a, b).0)
}

/// Returns `(distance_km, t)` where `t` in [0, 1] locates the closest point on `[a, b]`.
fn project_onto_segment(point: &Coordinate, a: &Coordinate, b: &Coordinate) -> (f64, f64) {
    let (ax, ay) = project_local(point, a);
    let (bx, by) = project_local(point, b);
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        return (ax.hypot(ay), 0.0);
    }

    // The query point is the origin of the local plane
    let t = (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0);
    ((ax + t * dx).hypot(ay + t * dy), t)
}

/// Closest segment of `polyline` to `point`.
///
/// Ties go to the lowest segment index.
///
/// # Example
/// ```
/// use sightline::{nearest_point_on_polyline, Coordinate, Polyline};
///
/// let line = Polyline::new(vec![
///     Coordinate::new(0.0, 0.0),
///     Coordinate::new(0.01, 0.0),
///     Coordinate::new(0.02, 0.0),
/// ]);
/// let nearest = nearest_point_on_polyline(&Coordinate::new(0.015, 0.001), &line).unwrap();
/// assert_eq!(nearest.segment_index, 1);
/// assert!(nearest.distance_km < 0.12);
/// ```
pub fn nearest_point_on_polyline(point: &Coordinate, polyline: &Polyline) -> Result<NearestPoint> {
    check_query_point(point)?;
    validate_polyline(polyline)?;
    nearest_on_validated(point, polyline)
}

fn check_query_point(point: &Coordinate) -> Result<()> {
    if point.is_valid() {
        Ok(())
    } else {
        Err(SightlineError::invalid_geometry(format!(
            "query point ({}, {}) is outside the WGS84 range",
            point.lon, point.lat
        )))
    }
}

/// Nearest-point query for a polyline that already passed [`validate_polyline`].
pub(crate) fn nearest_on_validated(
    point: &Coordinate,
    polyline: &Polyline,
) -> Result<NearestPoint> {
    let mut best: Option<NearestPoint> = None;

    for (i, seg) in polyline.vertices.windows(2).enumerate() {
        let (a, b) = (&seg[0], &seg[1]);
        let (distance_km, t) = project_onto_segment(point, a, b);

        // Strict comparison keeps the lowest index on ties
        if best.map_or(true, |current| distance_km < current.distance_km) {
            best = Some(NearestPoint {
                distance_km,
                segment_index: i,
                location: Coordinate::new(
                    a.lon + t * (b.lon - a.lon),
                    a.lat + t * (b.lat - a.lat),
                ),
            });
        }
    }

    best.ok_or_invalid_geometry("polyline has no segments")
}

// ============================================================================
// Area
// ============================================================================

/// Area of `polygon` in square kilometers: outer ring minus holes.
///
/// Returns 0 for a polygon without rings or with a degenerate outer ring
/// (unclosed, out of the WGS84 range, or fewer than 3 distinct vertices). Degenerate holes
/// contribute nothing.
pub fn polygon_area(polygon: &Polygon) -> f64 {
    let outer = ring_area_km2(polygon.exterior());
    if outer == 0.0 {
        return 0.0;
    }
    let holes: f64 = polygon.holes().iter().map(|h| ring_area_km2(h)).sum();
    (outer - holes).max(0.0)
}

/// Unsigned spherical area of a single closed ring in square kilometers.
pub fn ring_area_km2(ring: &[Coordinate]) -> f64 {
    if ring.len() < MIN_RING_COORDS
        || ring.first() != ring.last()
        || ring.iter().any(|c| !c.is_valid())
        || !has_three_distinct(ring)
    {
        return 0.0;
    }

    // Chamberlain & Duquette, "Some Algorithms for Polygons on a Sphere" (2007)
    let sum: f64 = ring
        .windows(2)
        .map(|edge| {
            let (a, b) = (&edge[0], &edge[1]);
            let lat_term = 2.0 + a.lat.to_radians().sin() + b.lat.to_radians().sin();
            (b.lon - a.lon).to_radians() * lat_term
        })
        .sum();

    let area = (sum * EARTH_RADIUS_KM * EARTH_RADIUS_KM / 2.0).abs();
    if area.is_finite() {
        area
    } else {
        0.0
    }
}

fn has_three_distinct(ring: &[Coordinate]) -> bool {
    let mut distinct: Vec<&Coordinate> = Vec::with_capacity(3);
    for c in ring {
        if !distinct.contains(&c) {
            distinct.push(c);
            if distinct.len() == 3 {
                return true;
            }
        }
    }
    false
}
