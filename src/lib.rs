//! # Sightline
//!
//! Spatial aggregation and scoring of species observations against two kinds of
//! reference geometry: watershed polygons and trail polylines.
//!
//! This library provides:
//! - A geometry kernel (point-in-polygon, point-to-segment distance, nearest
//!   point on a polyline, spherical polygon area)
//! - Watershed aggregation (per-region observation count and density)
//! - Trail scoring (per-trail nearby count and normalized score)
//! - Tier classification and rankings for presentation layers
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel aggregation and scoring with rayon
//! - **`geojson`** - Enable decoding of GeoJSON feature collections
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use sightline::{
//!     analyze, AnalysisConfig, AnalysisInput, Coordinate, Observation, Polygon, Region,
//! };
//!
//! let square = Polygon::new(
//!     vec![
//!         Coordinate::new(-71.0, 43.0),
//!         Coordinate::new(-70.0, 43.0),
//!         Coordinate::new(-70.0, 44.0),
//!         Coordinate::new(-71.0, 44.0),
//!         Coordinate::new(-71.0, 43.0),
//!     ],
//!     vec![],
//! );
//!
//! let mut input = AnalysisInput {
//!     observations: vec![Observation::new("obs-1", Coordinate::new(-70.5, 43.5))],
//!     regions: vec![Region::new("basin-1", "Upper Basin", square)],
//!     trails: vec![],
//! };
//!
//! let report = analyze(&mut input, &AnalysisConfig::default()).unwrap();
//! assert_eq!(report.regions[0].observation_count, 1);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, SightlineError};

// Geographic utilities (haversine, local projection, degree conversions)
pub mod geo_utils;

// Geometry kernel: containment, distance, area
pub mod kernel;
pub use kernel::{
    distance_point_to_segment, nearest_point_on_polyline, point_in_polygon, polygon_area,
    NearestPoint,
};

// R-tree indexes over region envelopes and observation coordinates
pub mod spatial_index;

// Watershed aggregation (exclusive, first-match-wins)
pub mod watersheds;
pub use watersheds::{aggregate_watersheds, AggregationStats};
#[cfg(feature = "parallel")]
pub use watersheds::aggregate_watersheds_parallel;

// Trail scoring (inclusive, a point may score many trails)
pub mod trails;
pub use trails::{score_trails, ScoringStats};
#[cfg(feature = "parallel")]
pub use trails::score_trails_parallel;

// Tier classification and rankings
pub mod classify;
pub use classify::{
    classify, classify_regions, rank_regions_by_count, rank_regions_by_density,
    rank_trails_by_nearby, Breakpoints,
};

// Analysis runs over owned regions and trails
pub mod engine;
pub use engine::{analyze, AnalysisReport, EngineStats, RegionSummary, SightingEngine, TrailSummary};

// Algorithm toolbox - standalone access to the primitives
pub mod algorithms;

// GeoJSON input adaptation
#[cfg(feature = "geojson")]
pub mod input;

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate in decimal degrees, longitude first.
///
/// # Example
/// ```
/// use sightline::Coordinate;
/// let summit = Coordinate::new(-71.3033, 44.2706); // Mount Washington
/// assert!(summit.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    /// Create a new coordinate from longitude and latitude.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// Check if the coordinate is finite and inside the WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lon >= -180.0
            && self.lon <= 180.0
    }
}

impl From<geo::Coord<f64>> for Coordinate {
    fn from(c: geo::Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

impl From<geo::Point<f64>> for Coordinate {
    fn from(p: geo::Point<f64>) -> Self {
        Self::new(p.x(), p.y())
    }
}

impl From<Coordinate> for geo::Coord<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Coord { x: c.lon, y: c.lat }
    }
}

/// A single species observation.
///
/// `attributes` is carried through untouched; the engine never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub coord: Coordinate,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl Observation {
    /// Create an observation with an empty payload.
    pub fn new(id: impl Into<String>, coord: Coordinate) -> Self {
        Self {
            id: id.into(),
            coord,
            attributes: serde_json::Value::Null,
        }
    }

    /// Attach an opaque attribute payload.
    pub fn with_attributes(mut self, attributes: serde_json::Value) -> Self {
        self.attributes = attributes;
        self
    }
}

/// A polygon made of closed linear rings.
///
/// The first ring is the outer boundary, any further rings are holes.
/// Each ring should hold at least 4 coordinates with first == last; see
/// [`kernel::validate_polygon`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Vec<Coordinate>>,
}

impl Polygon {
    /// Create a polygon from an outer ring and zero or more holes.
    pub fn new(exterior: Vec<Coordinate>, holes: Vec<Vec<Coordinate>>) -> Self {
        let mut rings = Vec::with_capacity(holes.len() + 1);
        rings.push(exterior);
        rings.extend(holes);
        Self { rings }
    }

    /// Outer boundary (empty if the polygon has no rings).
    pub fn exterior(&self) -> &[Coordinate] {
        self.rings.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Hole rings.
    pub fn holes(&self) -> &[Vec<Coordinate>] {
        self.rings.get(1..).unwrap_or(&[])
    }

    /// Bounding box of the outer ring.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_coords(self.exterior())
    }

    /// Check ring sizes, closure and coordinate finiteness.
    pub fn validate(&self) -> Result<()> {
        kernel::validate_polygon(self)
    }
}

impl From<&geo::Polygon<f64>> for Polygon {
    fn from(polygon: &geo::Polygon<f64>) -> Self {
        let ring = |ls: &geo::LineString<f64>| -> Vec<Coordinate> {
            ls.0.iter().map(|c| Coordinate::from(*c)).collect()
        };
        Self::new(
            ring(polygon.exterior()),
            polygon.interiors().iter().map(ring).collect(),
        )
    }
}

/// An open sequence of vertices.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    pub vertices: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(vertices: Vec<Coordinate>) -> Self {
        Self { vertices }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_coords(&self.vertices)
    }

    /// Check vertex count and coordinate finiteness.
    pub fn validate(&self) -> Result<()> {
        kernel::validate_polyline(self)
    }

    /// Total length in kilometers.
    pub fn length_km(&self) -> f64 {
        geo_utils::polyline_length_km(&self.vertices)
    }
}

impl From<&geo::LineString<f64>> for Polyline {
    fn from(line: &geo::LineString<f64>) -> Self {
        Self::new(line.0.iter().map(|c| Coordinate::from(*c)).collect())
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// Create bounds from coordinates, ignoring non-finite ones.
    pub fn from_coords(coords: &[Coordinate]) -> Option<Self> {
        let mut finite = coords.iter().filter(|c| c.is_finite());
        let first = finite.next()?;
        let mut bounds = Self {
            min_lon: first.lon,
            max_lon: first.lon,
            min_lat: first.lat,
            max_lat: first.lat,
        };

        for c in finite {
            bounds.min_lon = bounds.min_lon.min(c.lon);
            bounds.max_lon = bounds.max_lon.max(c.lon);
            bounds.min_lat = bounds.min_lat.min(c.lat);
            bounds.max_lat = bounds.max_lat.max(c.lat);
        }

        Some(bounds)
    }

    /// Inclusive containment test.
    pub fn contains(&self, coord: &Coordinate) -> bool {
        coord.lon >= self.min_lon
            && coord.lon <= self.max_lon
            && coord.lat >= self.min_lat
            && coord.lat <= self.max_lat
    }

    /// Grow the box so that it contains every coordinate whose local planar
    /// distance to some point inside the original box is at most `km`.
    ///
    /// The longitude margin uses the highest latitude of the grown box, so the
    /// result is conservative everywhere. Near the poles the longitude range
    /// becomes unbounded.
    pub fn expand_km(&self, km: f64) -> Self {
        // Slack keeps boundary distances that round to exactly `km` inside.
        let km = km * (1.0 + 1e-9) + 1e-9;
        let lat_margin = geo_utils::km_to_degrees_lat(km);
        let min_lat = (self.min_lat - lat_margin).max(-90.0);
        let max_lat = (self.max_lat + lat_margin).min(90.0);
        let widest_lat = min_lat.abs().max(max_lat.abs());

        match geo_utils::km_to_degrees_lon(km, widest_lat) {
            Some(lon_margin) => Self {
                min_lon: self.min_lon - lon_margin,
                max_lon: self.max_lon + lon_margin,
                min_lat,
                max_lat,
            },
            None => Self {
                min_lon: f64::MIN,
                max_lon: f64::MAX,
                min_lat,
                max_lat,
            },
        }
    }
}

/// Derived watershed metrics, overwritten on every run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionMetrics {
    /// Observations assigned to this region
    pub observation_count: u32,
    /// Observations per square kilometer (0 when the area is 0)
    pub density: f64,
}

/// A watershed polygon used as an aggregation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub polygon: Polygon,
    #[serde(default)]
    pub metrics: RegionMetrics,
}

impl Region {
    pub fn new(id: impl Into<String>, name: impl Into<String>, polygon: Polygon) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            polygon,
            metrics: RegionMetrics::default(),
        }
    }

    /// Area of the region in square kilometers.
    pub fn area_km2(&self) -> f64 {
        kernel::polygon_area(&self.polygon)
    }
}

/// Derived trail metrics, overwritten on every run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrailMetrics {
    /// Observations within the buffer distance of the trail
    pub nearby_count: u32,
    /// `nearby_count` divided by the busiest trail's count, rounded to 3 decimals
    pub normalized_score: f64,
}

/// A trail polyline scored by nearby observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    pub id: String,
    pub name: String,
    pub polyline: Polyline,
    #[serde(default)]
    pub metrics: TrailMetrics,
}

impl Trail {
    pub fn new(id: impl Into<String>, name: impl Into<String>, polyline: Polyline) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            polyline,
            metrics: TrailMetrics::default(),
        }
    }
}

/// Everything needed for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub observations: Vec<Observation>,
    pub regions: Vec<Region>,
    pub trails: Vec<Trail>,
}

/// Configuration for an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Radius around each trail within which an observation counts as nearby.
    /// Default: 0.1 km (100 meters)
    pub buffer_distance_km: f64,

    /// Tier thresholds for region classification, strictly ascending.
    /// Compared against each region's observation count, not its density.
    /// Default: [0, 1, 5, 15, 40, 100]
    pub density_breakpoints: Vec<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            buffer_distance_km: 0.1,
            density_breakpoints: classify::DEFAULT_BREAKPOINTS.to_vec(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a configuration from JSON. Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SightlineError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the buffer distance and breakpoints, returning validated breakpoints.
    pub fn validate(&self) -> Result<Breakpoints> {
        trails::validate_buffer_distance(self.buffer_distance_km)?;
        Breakpoints::new(self.density_breakpoints.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(-71.0, 43.0).is_valid());
        assert!(!Coordinate::new(0.0, 91.0).is_valid());
        assert!(!Coordinate::new(181.0, 0.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_polygon_accessors() {
        let outer = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(4.0, 0.0),
            Coordinate::new(4.0, 4.0),
            Coordinate::new(0.0, 0.0),
        ];
        let hole = vec![
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 1.0),
            Coordinate::new(2.0, 2.0),
            Coordinate::new(1.0, 1.0),
        ];
        let polygon = Polygon::new(outer.clone(), vec![hole]);
        assert_eq!(polygon.exterior(), outer.as_slice());
        assert_eq!(polygon.holes().len(), 1);

        let empty = Polygon::default();
        assert!(empty.exterior().is_empty());
        assert!(empty.holes().is_empty());
        assert!(empty.bounds().is_none());
    }

    #[test]
    fn test_from_geo_polygon_closes_rings() {
        use geo::{coord, LineString};

        let exterior = LineString::new(vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: 0.0 },
            coord! { x: 1.0, y: 1.0 },
        ]);
        let geo_polygon = geo::Polygon::new(exterior, vec![]);
        let polygon = Polygon::from(&geo_polygon);

        assert_eq!(polygon.exterior().len(), 4);
        assert!(polygon.validate().is_ok());
    }

    #[test]
    fn test_bounds_from_coords() {
        let coords = vec![
            Coordinate::new(-71.0, 43.0),
            Coordinate::new(f64::NAN, 50.0),
            Coordinate::new(-70.0, 44.0),
        ];
        let bounds = Bounds::from_coords(&coords).unwrap();
        assert_eq!(bounds.min_lon, -71.0);
        assert_eq!(bounds.max_lat, 44.0);
        assert!(bounds.contains(&Coordinate::new(-70.5, 43.5)));
        assert!(bounds.contains(&Coordinate::new(-71.0, 43.0)));
        assert!(!bounds.contains(&Coordinate::new(-69.0, 43.5)));
    }

    #[test]
    fn test_bounds_expand_km() {
        let bounds = Bounds::from_coords(&[Coordinate::new(10.0, 0.0)]).unwrap();
        let grown = bounds.expand_km(geo_utils::KM_PER_DEGREE);
        assert!((grown.max_lat - 1.0).abs() < 1e-6);
        assert!(grown.max_lon > 11.0);

        let polar = Bounds::from_coords(&[Coordinate::new(0.0, 89.99)]).unwrap();
        let grown = polar.expand_km(5.0);
        assert_eq!(grown.max_lat, 90.0);
        assert_eq!(grown.max_lon, f64::MAX);
    }

    #[test]
    fn test_config_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.buffer_distance_km, 0.1);
        assert_eq!(
            config.density_breakpoints,
            vec![0.0, 1.0, 5.0, 15.0, 40.0, 100.0]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let config = AnalysisConfig::from_json(r#"{ "buffer_distance_km": 0.25 }"#).unwrap();
        assert_eq!(config.buffer_distance_km, 0.25);
        assert_eq!(config.density_breakpoints.len(), 6);

        let err = AnalysisConfig::from_json(r#"{ "buffer_distance_km": -1.0 }"#).unwrap_err();
        assert!(matches!(err, SightlineError::Configuration { .. }));

        let err = AnalysisConfig::from_json(r#"{ "density_breakpoints": [5, 1] }"#).unwrap_err();
        assert!(matches!(err, SightlineError::Configuration { .. }));

        assert!(AnalysisConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_observation_payload_round_trip() {
        let obs = Observation::new("inat-1", Coordinate::new(-71.1, 43.2))
            .with_attributes(serde_json::json!({ "species": "Alces alces" }));
        let json = serde_json::to_string(&obs).unwrap();
        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, obs);
        assert_eq!(back.attributes["species"], "Alces alces");
    }
}
