//! Watershed aggregation.
//!
//! Every observation is assigned to at most one region: regions are checked in
//! the order they were supplied and the first one containing the observation
//! wins, even when regions overlap. Counts and densities are reset and
//! recomputed from scratch on every call.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::kernel::{contains_validated, polygon_area, validate_polygon};
use crate::spatial_index::RegionIndex;
use crate::{Coordinate, Observation, Region, RegionMetrics};

/// Summary of one aggregation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregationStats {
    /// Observations supplied
    pub total_observations: usize,
    /// Observations counted in some region
    pub assigned: usize,
    /// Observations outside every region (or with invalid coordinates)
    pub unassigned: usize,
    /// Regions skipped because their polygon is malformed
    pub skipped_regions: usize,
}

/// Count observations per region and derive densities.
///
/// Malformed regions keep zero metrics and are skipped as candidates; the rest
/// of the run is unaffected. Observations outside every region are dropped
/// from the counts.
///
/// # Example
/// ```
/// use sightline::{aggregate_watersheds, Coordinate, Observation, Polygon, Region};
///
/// let ring = vec![
///     Coordinate::new(-71.0, 43.0),
///     Coordinate::new(-70.0, 43.0),
///     Coordinate::new(-70.0, 44.0),
///     Coordinate::new(-71.0, 44.0),
///     Coordinate::new(-71.0, 43.0),
/// ];
/// let mut regions = vec![Region::new("w1", "Saco", Polygon::new(ring, vec![]))];
/// let observations = vec![
///     Observation::new("a", Coordinate::new(-70.5, 43.5)),
///     Observation::new("b", Coordinate::new(-60.0, 43.5)),
/// ];
///
/// let stats = aggregate_watersheds(&mut regions, &observations);
/// assert_eq!(regions[0].metrics.observation_count, 1);
/// assert_eq!(stats.unassigned, 1);
/// ```
pub fn aggregate_watersheds(
    regions: &mut [Region],
    observations: &[Observation],
) -> AggregationStats {
    reset_metrics(regions);

    let usable = usable_regions(regions);
    let index = RegionIndex::build(regions, &usable);

    let mut counts = vec![0u32; regions.len()];
    for obs in observations {
        if let Some(idx) = first_containing_region(&obs.coord, regions, &index) {
            counts[idx] += 1;
        }
    }

    finish(regions, &counts, observations.len(), usable.len())
}

/// Parallel version of [`aggregate_watersheds`].
///
/// Observations are split across rayon workers, each accumulating its own
/// per-region counts which are summed at the end. Region order per
/// observation is the same as the sequential version, so results are identical.
#[cfg(feature = "parallel")]
pub fn aggregate_watersheds_parallel(
    regions: &mut [Region],
    observations: &[Observation],
) -> AggregationStats {
    use rayon::prelude::*;

    reset_metrics(regions);

    let usable = usable_regions(regions);
    let index = RegionIndex::build(regions, &usable);
    let region_count = regions.len();
    let shared: &[Region] = &*regions;

    let counts = observations
        .par_iter()
        .fold(
            || vec![0u32; region_count],
            |mut partial, obs| {
                if let Some(idx) = first_containing_region(&obs.coord, shared, &index) {
                    partial[idx] += 1;
                }
                partial
            },
        )
        .reduce(
            || vec![0u32; region_count],
            |mut total, partial| {
                for (t, p) in total.iter_mut().zip(partial) {
                    *t += p;
                }
                total
            },
        );

    finish(regions, &counts, observations.len(), usable.len())
}

/// Observations per square kilometer, 0 when the area is 0 or not finite.
pub fn density(count: u32, area_km2: f64) -> f64 {
    if area_km2 > 0.0 && area_km2.is_finite() {
        let d = count as f64 / area_km2;
        if d.is_finite() {
            return d;
        }
    }
    0.0
}

fn reset_metrics(regions: &mut [Region]) {
    for region in regions.iter_mut() {
        region.metrics = RegionMetrics::default();
    }
}

/// Positions of regions with well-formed polygons, in input order.
fn usable_regions(regions: &[Region]) -> Vec<usize> {
    regions
        .iter()
        .enumerate()
        .filter_map(|(i, region)| match validate_polygon(&region.polygon) {
            Ok(()) => Some(i),
            Err(e) => {
                warn!("Skipping region '{}': {}", region.id, e);
                None
            }
        })
        .collect()
}

fn first_containing_region(
    coord: &Coordinate,
    regions: &[Region],
    index: &RegionIndex,
) -> Option<usize> {
    if !coord.is_valid() {
        return None;
    }
    index
        .candidates_at(coord)
        .into_iter()
        .find(|&idx| contains_validated(coord, &regions[idx].polygon))
}

fn finish(
    regions: &mut [Region],
    counts: &[u32],
    total_observations: usize,
    usable: usize,
) -> AggregationStats {
    let mut assigned = 0usize;
    for (region, &count) in regions.iter_mut().zip(counts) {
        assigned += count as usize;
        region.metrics = RegionMetrics {
            observation_count: count,
            density: density(count, polygon_area(&region.polygon)),
        };
    }

    let stats = AggregationStats {
        total_observations,
        assigned,
        unassigned: total_observations - assigned,
        skipped_regions: regions.len() - usable,
    };

    debug!(
        "Aggregated {} observations into {} regions \
         ({} assigned, {} unassigned, {} skipped regions)",
        stats.total_observations,
        regions.len(),
        stats.assigned,
        stats.unassigned,
        stats.skipped_regions
    );

    stats
}
