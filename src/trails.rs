//! Trail scoring.
//!
//! Unlike watershed aggregation, trail buffers overlap: an observation counts
//! toward every trail within the buffer distance. Counts are normalized by the
//! busiest trail so the top trail scores 1.0.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SightlineError};
use crate::geo_utils::round3;
use crate::kernel::{nearest_on_validated, validate_polyline};
use crate::spatial_index::ObservationIndex;
use crate::{Observation, Trail, TrailMetrics};

/// Summary of one scoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoringStats {
    /// Observations supplied
    pub total_observations: usize,
    /// Trails skipped because their polyline is malformed
    pub skipped_trails: usize,
    /// Highest nearby count over all trails (0 when nothing is nearby)
    pub max_count: u32,
}

/// Reject buffer distances that are not finite and positive.
pub fn validate_buffer_distance(buffer_distance_km: f64) -> Result<()> {
    if buffer_distance_km.is_finite() && buffer_distance_km > 0.0 {
        Ok(())
    } else {
        Err(SightlineError::configuration(format!(
            "buffer distance must be a positive number of kilometers, got {}",
            buffer_distance_km
        )))
    }
}

/// Count observations within `buffer_distance_km` of each trail and normalize.
///
/// The buffer is validated before any metric is reset, so a rejected call
/// leaves trails untouched. Malformed trails end with zero metrics.
///
/// # Example
/// ```
/// use sightline::{score_trails, Coordinate, Observation, Polyline, Trail};
///
/// let mut trails = vec![Trail::new(
///     "t1",
///     "Ridge Trail",
///     Polyline::new(vec![Coordinate::new(-71.0, 43.0), Coordinate::new(-70.99, 43.0)]),
/// )];
/// let observations = vec![Observation::new("a", Coordinate::new(-70.995, 43.0002))];
///
/// score_trails(&mut trails, &observations, 0.1).unwrap();
/// assert_eq!(trails[0].metrics.nearby_count, 1);
/// assert_eq!(trails[0].metrics.normalized_score, 1.0);
/// ```
pub fn score_trails(
    trails: &mut [Trail],
    observations: &[Observation],
    buffer_distance_km: f64,
) -> Result<ScoringStats> {
    validate_buffer_distance(buffer_distance_km)?;
    reset_metrics(trails);

    let index = ObservationIndex::build(observations);
    log_index(&index, observations.len());
    let counts: Vec<Option<u32>> = trails
        .iter()
        .map(|trail| count_nearby(trail, observations, &index, buffer_distance_km))
        .collect();

    Ok(finish(trails, &counts, observations.len()))
}

/// Parallel version of [`score_trails`].
///
/// Each trail is counted independently on a rayon worker; there is no shared
/// counter, so results are identical to the sequential version.
#[cfg(feature = "parallel")]
pub fn score_trails_parallel(
    trails: &mut [Trail],
    observations: &[Observation],
    buffer_distance_km: f64,
) -> Result<ScoringStats> {
    use rayon::prelude::*;

    validate_buffer_distance(buffer_distance_km)?;
    reset_metrics(trails);

    let index = ObservationIndex::build(observations);
    log_index(&index, observations.len());
    let counts: Vec<Option<u32>> = trails
        .par_iter()
        .map(|trail| count_nearby(trail, observations, &index, buffer_distance_km))
        .collect();

    Ok(finish(trails, &counts, observations.len()))
}

fn log_index(index: &ObservationIndex, total: usize) {
    if index.len() < total {
        debug!(
            "Indexed {} of {} observations ({} with invalid coordinates)",
            index.len(),
            total,
            total - index.len()
        );
    }
}

fn reset_metrics(trails: &mut [Trail]) {
    for trail in trails.iter_mut() {
        trail.metrics = TrailMetrics::default();
    }
}

/// Nearby observation count for one trail, `None` if the trail is malformed.
fn count_nearby(
    trail: &Trail,
    observations: &[Observation],
    index: &ObservationIndex,
    buffer_distance_km: f64,
) -> Option<u32> {
    if let Err(e) = validate_polyline(&trail.polyline) {
        warn!("Skipping trail '{}': {}", trail.id, e);
        return None;
    }
    if index.is_empty() {
        return Some(0);
    }

    let search = trail.polyline.bounds()?.expand_km(buffer_distance_km);

    let count = index
        .candidates(&search)
        .into_iter()
        .filter(|&idx| {
            nearest_on_validated(&observations[idx].coord, &trail.polyline)
                .map(|nearest| nearest.distance_km <= buffer_distance_km)
                .unwrap_or(false)
        })
        .count();

    Some(count as u32)
}

fn finish(trails: &mut [Trail], counts: &[Option<u32>], total_observations: usize) -> ScoringStats {
    let max_count = counts.iter().flatten().copied().max().unwrap_or(0);
    // Floor of 1 so an all-zero run divides safely
    let divisor = max_count.max(1) as f64;

    for (trail, count) in trails.iter_mut().zip(counts) {
        let nearby_count = count.unwrap_or(0);
        trail.metrics = TrailMetrics {
            nearby_count,
            normalized_score: round3(nearby_count as f64 / divisor),
        };
    }

    let stats = ScoringStats {
        total_observations,
        skipped_trails: counts.iter().filter(|c| c.is_none()).count(),
        max_count,
    };

    debug!(
        "Scored {} trails against {} observations (max nearby {}, {} skipped)",
        trails.len(),
        stats.total_observations,
        stats.max_count,
        stats.skipped_trails
    );

    stats
}
