//! Tier classification and rankings.
//!
//! Stateless helpers that turn region/trail metrics into presentation-ready
//! tiers and orderings. Rankings are stable: equal metrics keep input order.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SightlineError};
use crate::{Region, Trail};

/// Default tier thresholds: `[0, 1, 5, 15, 40, 100]`.
pub const DEFAULT_BREAKPOINTS: [f64; 6] = [0.0, 1.0, 5.0, 15.0, 40.0, 100.0];

/// Validated tier thresholds (non-empty, finite, non-negative, strictly ascending).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Breakpoints(Vec<f64>);

impl Breakpoints {
    /// Validate and wrap a threshold list.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        validate_breakpoints(&values)?;
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of tiers (one per threshold).
    pub fn tier_count(&self) -> usize {
        self.0.len()
    }

    /// Tier index for `value`; see [`classify`].
    pub fn classify(&self, value: f64) -> usize {
        classify(value, &self.0)
    }
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self(DEFAULT_BREAKPOINTS.to_vec())
    }
}

impl TryFrom<Vec<f64>> for Breakpoints {
    type Error = SightlineError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<Breakpoints> for Vec<f64> {
    fn from(breakpoints: Breakpoints) -> Self {
        breakpoints.0
    }
}

/// Check that thresholds are non-empty, finite, non-negative and strictly ascending.
pub fn validate_breakpoints(values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(SightlineError::configuration("breakpoints must not be empty"));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(SightlineError::configuration(format!(
            "breakpoints must be finite and non-negative, got {}",
            bad
        )));
    }
    if let Some(pair) = values.windows(2).find(|w| w[1] <= w[0]) {
        return Err(SightlineError::configuration(format!(
            "breakpoints must be strictly ascending, got {} followed by {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

/// Highest index `i` with `value >= breakpoints[i]`, or 0 if there is none.
///
/// Thresholds are not validated here. Out-of-order thresholds still produce
/// some index in range (never a panic); NaN values map to tier 0.
///
/// # Example
/// ```
/// use sightline::classify;
///
/// let breaks = [0.0, 1.0, 5.0, 15.0, 40.0, 100.0];
/// assert_eq!(classify(42.0, &breaks), 4);
/// assert_eq!(classify(0.0, &breaks), 0);
/// assert_eq!(classify(250.0, &breaks), 5);
/// ```
pub fn classify(value: f64, breakpoints: &[f64]) -> usize {
    breakpoints
        .iter()
        .rposition(|&threshold| value >= threshold)
        .unwrap_or(0)
}

/// Tier of every region, keyed by observation count.
pub fn classify_regions(regions: &[Region], breakpoints: &Breakpoints) -> Vec<usize> {
    regions
        .iter()
        .map(|r| breakpoints.classify(r.metrics.observation_count as f64))
        .collect()
}

/// Regions with at least one observation, busiest first.
pub fn rank_regions_by_count(regions: &[Region]) -> Vec<&Region> {
    let mut ranked: Vec<&Region> = regions
        .iter()
        .filter(|r| r.metrics.observation_count > 0)
        .collect();
    ranked.sort_by_key(|r| Reverse(r.metrics.observation_count));
    ranked
}

/// Regions with at least one observation, densest first.
pub fn rank_regions_by_density(regions: &[Region]) -> Vec<&Region> {
    let mut ranked: Vec<&Region> = regions
        .iter()
        .filter(|r| r.metrics.observation_count > 0)
        .collect();
    ranked.sort_by(|a, b| b.metrics.density.total_cmp(&a.metrics.density));
    ranked
}

/// Trails with at least one nearby observation, busiest first.
pub fn rank_trails_by_nearby(trails: &[Trail]) -> Vec<&Trail> {
    let mut ranked: Vec<&Trail> = trails.iter().filter(|t| t.metrics.nearby_count > 0).collect();
    ranked.sort_by_key(|t| Reverse(t.metrics.nearby_count));
    ranked
}
