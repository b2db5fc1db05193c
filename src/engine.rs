//! # Sighting Engine
//!
//! Runs the full analysis: watershed aggregation, trail scoring, then
//! classification and ranking.
//!
//! ## Architecture
//!
//! Regions and trails live across many runs; observations arrive per run.
//! Every run resets and recomputes all metrics, so nothing leaks from one
//! species selection to the next. [`SightingEngine`] owns the geometry and
//! takes `&mut self` for a run, which keeps a single writer per region set.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::classify::{classify_regions, rank_regions_by_count, rank_trails_by_nearby, Breakpoints};
use crate::error::{Result, SightlineError};
use crate::{AnalysisConfig, AnalysisInput, Observation, Region, Trail};

#[cfg(not(feature = "parallel"))]
use crate::{aggregate_watersheds, score_trails};

#[cfg(feature = "parallel")]
use crate::{aggregate_watersheds_parallel, score_trails_parallel};

use crate::trails::ScoringStats;
use crate::watersheds::AggregationStats;

// ============================================================================
// Report Types
// ============================================================================

/// Per-region result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    pub id: String,
    pub name: String,
    pub observation_count: u32,
    /// Observations per square kilometer
    pub density: f64,
    /// Tier index from the configured breakpoints
    pub tier: usize,
}

/// Per-trail result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailSummary {
    pub id: String,
    pub name: String,
    pub nearby_count: u32,
    /// 0.0 - 1.0, relative to the busiest trail
    pub normalized_score: f64,
}

/// Everything a presentation layer needs from one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Regions in input order
    pub regions: Vec<RegionSummary>,
    /// Trails in input order
    pub trails: Vec<TrailSummary>,
    /// Region ids with observations, busiest first
    pub ranked_regions: Vec<String>,
    /// Trail ids with nearby observations, busiest first
    pub ranked_trails: Vec<String>,
    pub aggregation: AggregationStats,
    pub scoring: ScoringStats,
}

impl AnalysisReport {
    /// Serialize the report to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SightlineError::Serialization(e.to_string()))
    }
}

// ============================================================================
// One-shot Analysis
// ============================================================================

/// Run a full analysis over caller-owned input.
///
/// The configuration is validated first; on error nothing in `input` is
/// modified. On success every region and trail metric is overwritten.
pub fn analyze(input: &mut AnalysisInput, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let breakpoints = config.validate()?;
    run_analysis(
        &mut input.regions,
        &mut input.trails,
        &input.observations,
        config.buffer_distance_km,
        &breakpoints,
    )
}

fn run_analysis(
    regions: &mut [Region],
    trails: &mut [Trail],
    observations: &[Observation],
    buffer_distance_km: f64,
    breakpoints: &Breakpoints,
) -> Result<AnalysisReport> {
    #[cfg(feature = "parallel")]
    let (aggregation, scoring) = (
        aggregate_watersheds_parallel(regions, observations),
        score_trails_parallel(trails, observations, buffer_distance_km)?,
    );

    #[cfg(not(feature = "parallel"))]
    let (aggregation, scoring) = (
        aggregate_watersheds(regions, observations),
        score_trails(trails, observations, buffer_distance_km)?,
    );

    let tiers = classify_regions(regions, breakpoints);

    let report = AnalysisReport {
        regions: regions
            .iter()
            .zip(tiers)
            .map(|(r, tier)| RegionSummary {
                id: r.id.clone(),
                name: r.name.clone(),
                observation_count: r.metrics.observation_count,
                density: r.metrics.density,
                tier,
            })
            .collect(),
        trails: trails
            .iter()
            .map(|t| TrailSummary {
                id: t.id.clone(),
                name: t.name.clone(),
                nearby_count: t.metrics.nearby_count,
                normalized_score: t.metrics.normalized_score,
            })
            .collect(),
        ranked_regions: rank_regions_by_count(regions)
            .into_iter()
            .map(|r| r.id.clone())
            .collect(),
        ranked_trails: rank_trails_by_nearby(trails)
            .into_iter()
            .map(|t| t.id.clone())
            .collect(),
        aggregation,
        scoring,
    };

    debug!(
        "Analysis complete: {} regions ranked, {} trails ranked",
        report.ranked_regions.len(),
        report.ranked_trails.len()
    );

    Ok(report)
}

// ============================================================================
// Sighting Engine
// ============================================================================

/// Engine statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub region_count: usize,
    pub trail_count: usize,
    pub runs: u64,
}

/// Holds regions, trails and configuration across analysis runs.
pub struct SightingEngine {
    regions: Vec<Region>,
    trails: Vec<Trail>,
    config: AnalysisConfig,
    breakpoints: Breakpoints,
    runs: u64,
}

impl SightingEngine {
    /// Create an engine with default configuration.
    pub fn new(regions: Vec<Region>, trails: Vec<Trail>) -> Self {
        Self {
            regions,
            trails,
            config: AnalysisConfig::default(),
            breakpoints: Breakpoints::default(),
            runs: 0,
        }
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(
        regions: Vec<Region>,
        trails: Vec<Trail>,
        config: AnalysisConfig,
    ) -> Result<Self> {
        let mut engine = Self::new(regions, trails);
        engine.set_config(config)?;
        Ok(engine)
    }

    /// Replace the configuration. Rejected configs leave the old one in place.
    pub fn set_config(&mut self, config: AnalysisConfig) -> Result<()> {
        self.breakpoints = config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn trails(&self) -> &[Trail] {
        &self.trails
    }

    pub fn add_region(&mut self, region: Region) {
        self.regions.push(region);
    }

    pub fn add_trail(&mut self, trail: Trail) {
        self.trails.push(trail);
    }

    /// Analyze one observation set, overwriting every region and trail metric.
    pub fn run(&mut self, observations: &[Observation]) -> Result<AnalysisReport> {
        self.runs += 1;
        info!(
            "Analysis run {}: {} observations, {} regions, {} trails",
            self.runs,
            observations.len(),
            self.regions.len(),
            self.trails.len()
        );
        run_analysis(
            &mut self.regions,
            &mut self.trails,
            observations,
            self.config.buffer_distance_km,
            &self.breakpoints,
        )
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            region_count: self.regions.len(),
            trail_count: self.trails.len(),
            runs: self.runs,
        }
    }
}

impl Default for SightingEngine {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coordinate, Polygon, Polyline};

    fn square(min_lon: f64, min_lat: f64, size: f64) -> Polygon {
        Polygon::new(
            vec![
                Coordinate::new(min_lon, min_lat),
                Coordinate::new(min_lon + size, min_lat),
                Coordinate::new(min_lon + size, min_lat + size),
                Coordinate::new(min_lon, min_lat + size),
                Coordinate::new(min_lon, min_lat),
            ],
            vec![],
        )
    }

    fn sample_input() -> AnalysisInput {
        AnalysisInput {
            observations: vec![
                Observation::new("o1", Coordinate::new(0.5, 0.5)),
                Observation::new("o2", Coordinate::new(0.5, 0.5005)),
                Observation::new("o3", Coordinate::new(1.5, 0.5)),
            ],
            regions: vec![
                Region::new("west", "West", square(0.0, 0.0, 1.0)),
                Region::new("east", "East", square(1.0, 0.0, 1.0)),
                Region::new("north", "North", square(0.0, 5.0, 1.0)),
            ],
            trails: vec![
                Trail::new(
                    "ridge",
                    "Ridge",
                    Polyline::new(vec![Coordinate::new(0.49, 0.5), Coordinate::new(0.51, 0.5)]),
                ),
                Trail::new(
                    "valley",
                    "Valley",
                    Polyline::new(vec![Coordinate::new(1.49, 0.5), Coordinate::new(1.51, 0.5)]),
                ),
            ],
        }
    }

    #[test]
    fn test_analyze_report() {
        let mut input = sample_input();
        let report = analyze(&mut input, &AnalysisConfig::default()).unwrap();

        assert_eq!(report.ranked_regions, vec!["west", "east"]);
        assert_eq!(report.regions[0].observation_count, 2);
        assert_eq!(report.regions[0].tier, 1);
        assert_eq!(report.regions[2].tier, 0);

        assert_eq!(report.ranked_trails, vec!["ridge", "valley"]);
        assert_eq!(report.trails[0].normalized_score, 1.0);
        assert_eq!(report.trails[1].normalized_score, 0.5);

        assert_eq!(report.aggregation.assigned, 3);
        assert_eq!(report.scoring.max_count, 2);

        // Metrics were written back to the caller's objects
        assert_eq!(input.regions[1].metrics.observation_count, 1);
        assert_eq!(input.trails[0].metrics.nearby_count, 2);
    }

    #[test]
    fn test_analyze_rejects_config_before_mutation() {
        let mut input = sample_input();
        analyze(&mut input, &AnalysisConfig::default()).unwrap();
        let before = input.regions.clone();

        input.observations.clear();
        let bad = AnalysisConfig {
            density_breakpoints: vec![10.0, 5.0],
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            analyze(&mut input, &bad),
            Err(SightlineError::Configuration { .. })
        ));
        assert_eq!(input.regions, before);
    }

    #[test]
    fn test_report_json() {
        let mut input = sample_input();
        let report = analyze(&mut input, &AnalysisConfig::default()).unwrap();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"rankedRegions\""));
        assert!(json.contains("\"observationCount\":2"));

        let back: AnalysisReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ranked_regions, report.ranked_regions);
        assert_eq!(back.trails, report.trails);
        assert_eq!(back.aggregation, report.aggregation);
    }

    #[test]
    fn test_engine_runs_are_independent() {
        let input = sample_input();
        let mut engine = SightingEngine::new(input.regions, input.trails);

        let first = engine.run(&input.observations).unwrap();
        let again = engine.run(&input.observations).unwrap();
        assert_eq!(first, again);

        let empty = engine.run(&[]).unwrap();
        assert!(empty.ranked_regions.is_empty());
        assert!(empty.ranked_trails.is_empty());
        assert!(engine.regions().iter().all(|r| r.metrics.observation_count == 0));
        assert!(engine.trails().iter().all(|t| t.metrics.normalized_score == 0.0));

        assert_eq!(engine.stats().runs, 3);
        assert_eq!(engine.stats().region_count, 3);
    }

    #[test]
    fn test_engine_config() {
        let mut engine = SightingEngine::default();
        assert_eq!(engine.config().buffer_distance_km, 0.1);

        let wide = AnalysisConfig {
            buffer_distance_km: 2.0,
            ..AnalysisConfig::default()
        };
        engine.set_config(wide.clone()).unwrap();
        assert_eq!(engine.config(), &wide);

        let bad = AnalysisConfig {
            buffer_distance_km: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(engine.set_config(bad).is_err());
        assert_eq!(engine.config(), &wide);

        assert!(SightingEngine::with_config(vec![], vec![], AnalysisConfig::default()).is_ok());
    }

    #[test]
    fn test_engine_wider_buffer_reaches_more_trails() {
        let input = sample_input();
        let config = AnalysisConfig {
            buffer_distance_km: 200.0,
            ..AnalysisConfig::default()
        };
        let mut engine = SightingEngine::with_config(input.regions, input.trails, config).unwrap();
        engine.add_trail(Trail::new(
            "far",
            "Far",
            Polyline::new(vec![Coordinate::new(30.0, 30.0), Coordinate::new(30.1, 30.0)]),
        ));
        let report = engine.run(&input.observations).unwrap();
        assert_eq!(report.trails[0].nearby_count, 3);
        assert_eq!(report.trails[1].nearby_count, 3);
        assert_eq!(report.trails[2].nearby_count, 0);
        assert_eq!(engine.stats().trail_count, 3);
    }
}
