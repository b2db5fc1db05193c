//! # Algorithm Toolbox
//!
//! This module provides direct access to the geometry kernel and the
//! aggregation algorithms. Use these for integrating specific algorithms into
//! your own systems without going through [`crate::SightingEngine`].
//!
//! ## Core Algorithms
//!
//! - **Watershed Aggregation**: exclusive, first-match-wins counting
//! - **Trail Scoring**: inclusive buffer counting with normalization
//! - **Classification**: breakpoint tiers and stable rankings
//!
//! ## Geometry Kernel
//!
//! - **Point in Polygon**: even-odd ray casting with holes
//! - **Segment Distance**: local-plane distance in kilometers
//! - **Nearest Point on Polyline**: closest segment and location
//! - **Polygon Area**: spherical ring area in square kilometers
//!
//! # Example
//!
//! ```rust
//! use sightline::algorithms::{distance_point_to_segment, haversine_km, Coordinate};
//!
//! let a = Coordinate::new(-71.0, 43.0);
//! let b = Coordinate::new(-70.99, 43.0);
//! let p = Coordinate::new(-70.995, 43.001);
//!
//! let to_trail = distance_point_to_segment(&p, &a, &b).unwrap();
//! let to_start = haversine_km(&p, &a);
//! assert!(to_trail < to_start);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{
    AnalysisConfig, Bounds, Coordinate, Observation, Polygon, Polyline, Region, RegionMetrics,
    Trail, TrailMetrics,
};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{
    haversine_km, km_to_degrees_lat, km_to_degrees_lon, polyline_length_km, project_local,
    EARTH_RADIUS_KM, KM_PER_DEGREE,
};

// =============================================================================
// Geometry Kernel
// =============================================================================

/// Point-in-polygon test (boundary points are outside).
pub use crate::kernel::point_in_polygon;

/// Distance in kilometers from a point to a segment.
pub use crate::kernel::distance_point_to_segment;

/// Closest segment of a polyline to a point.
pub use crate::kernel::{nearest_point_on_polyline, NearestPoint};

/// Polygon and single-ring areas in square kilometers.
pub use crate::kernel::{polygon_area, ring_area_km2};

/// Geometry validation.
pub use crate::kernel::{validate_polygon, validate_polyline, validate_ring};

// =============================================================================
// Aggregation
// =============================================================================

/// Count observations per watershed (first match wins).
pub use crate::watersheds::{aggregate_watersheds, density, AggregationStats};

/// Parallel watershed aggregation.
#[cfg(feature = "parallel")]
pub use crate::watersheds::aggregate_watersheds_parallel;

/// Count observations near each trail and normalize.
pub use crate::trails::{score_trails, validate_buffer_distance, ScoringStats};

/// Parallel trail scoring.
#[cfg(feature = "parallel")]
pub use crate::trails::score_trails_parallel;

// =============================================================================
// Classification
// =============================================================================

pub use crate::classify::{
    classify, classify_regions, rank_regions_by_count, rank_regions_by_density,
    rank_trails_by_nearby, validate_breakpoints, Breakpoints, DEFAULT_BREAKPOINTS,
};

// =============================================================================
// Spatial Indexing
// =============================================================================

/// Observation and region R-tree prefilters.
pub use crate::spatial_index::{ObservationIndex, RegionIndex};
