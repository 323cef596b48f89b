//! End-to-end corridor search
//!
//! A run moves through the stages
//! `Loaded → Validated → Simplified → Interpolated → Searched → Compared → Done`
//! exactly once, in order. The first failure stops the run and is returned
//! wrapped in [`SearchError::Stage`] naming the stage that failed.

use crate::compare::{Comparator, ComparisonReport};
use crate::search::{Algorithm, SearchResult};
use crate::{
    RawStation, Result, Route, RoutePoint, RouteStats, SearchConfig, SearchError,
    SimplificationStats, StationSet, densify_route, simplify_route,
};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pipeline stages in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Stage {
    Loaded,
    Validated,
    Simplified,
    Interpolated,
    Searched,
    Compared,
    Done,
}

impl Stage {
    pub const ORDER: [Stage; 7] = [
        Stage::Loaded,
        Stage::Validated,
        Stage::Simplified,
        Stage::Interpolated,
        Stage::Searched,
        Stage::Compared,
        Stage::Done,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Loaded => "Loaded",
            Stage::Validated => "Validated",
            Stage::Simplified => "Simplified",
            Stage::Interpolated => "Interpolated",
            Stage::Searched => "Searched",
            Stage::Compared => "Compared",
            Stage::Done => "Done",
        };
        f.write_str(name)
    }
}

/// Everything a successful run produces
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub stations: StationSet,
    /// Statistics of the route as loaded
    pub raw_stats: RouteStats,
    pub simplified: SimplificationStats,
    /// Number of query points after densification
    pub densified_points: usize,
    pub tree: SearchResult,
    pub buffer: SearchResult,
    pub report: ComparisonReport,
    primary: Algorithm,
}

impl PipelineOutput {
    /// Result of the configured primary algorithm
    pub fn primary(&self) -> &SearchResult {
        match self.primary {
            Algorithm::KdTree => &self.tree,
            Algorithm::Buffer => &self.buffer,
        }
    }
}

/// Linear driver for one search run
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: SearchConfig,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Pipeline {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run every stage on the supplied route and raw station records
    ///
    /// # Errors
    /// [`SearchError::Stage`] wrapping the first failure.
    pub fn run(&self, route: Vec<RoutePoint>, stations: Vec<RawStation>) -> Result<PipelineOutput> {
        let config = &self.config;

        let route = at(Stage::Loaded, || {
            config.validate()?;
            Route::new(route)
        })?;
        let raw_stats = route.stats().clone();
        enter(Stage::Loaded, || {
            format!(
                "{} route points, {:.2} km",
                raw_stats.point_count,
                raw_stats.total_length_km()
            )
        });

        let stations = StationSet::validate(stations);
        if stations.valid().is_empty() {
            tracing::warn!("No valid stations; searches will return empty results");
        }
        enter(Stage::Validated, || {
            format!(
                "{} valid, {} invalid",
                stations.valid().len(),
                stations.invalid().len()
            )
        });

        let simplified = simplify_route(&route, config.simplify_tolerance_m);
        drop(route);
        enter(Stage::Simplified, || {
            format!(
                "{} to {} points",
                simplified.stats.original_points, simplified.stats.simplified_points
            )
        });

        let max_gap = config.effective_max_gap();
        let densified = at(Stage::Interpolated, || {
            densify_route(&simplified.route, max_gap)
        })?;
        enter(Stage::Interpolated, || {
            format!("{} query points, max gap {max_gap:.1} m", densified.len())
        });

        let comparison = at(Stage::Searched, || {
            Comparator::new(config).compare(&densified, stations.valid())
        })?;
        enter(Stage::Searched, || {
            format!(
                "{} by tree, {} by buffer",
                comparison.tree.len(),
                comparison.buffer.len()
            )
        });

        enter(Stage::Compared, || {
            format!(
                "{} matched, {} divergent",
                comparison.report.matched.len(),
                comparison.report.divergence.len()
            )
        });

        let output = PipelineOutput {
            stations,
            raw_stats,
            simplified: simplified.stats,
            densified_points: densified.len(),
            tree: comparison.tree,
            buffer: comparison.buffer,
            report: comparison.report,
            primary: config.primary,
        };
        enter(Stage::Done, || {
            format!("{} stations within radius", output.primary().len())
        });
        Ok(output)
    }
}

/// Run a fallible stage, tagging its error with the stage
fn at<T>(stage: Stage, work: impl FnOnce() -> Result<T>) -> Result<T> {
    work().map_err(|source| {
        tracing::error!(%stage, error = %source, "Pipeline halted");
        SearchError::Stage {
            stage,
            source: Box::new(source),
        }
    })
}

fn enter(stage: Stage, detail: impl FnOnce() -> String) {
    tracing::info!(%stage, "{}", detail());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_names() {
        assert!(Stage::ORDER.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(Stage::Interpolated.to_string(), "Interpolated");
    }

    #[test]
    fn test_empty_route_halts_at_loaded() {
        let err = Pipeline::new(SearchConfig::default())
            .run(Vec::new(), Vec::new())
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Loaded));
        assert!(matches!(
            err,
            SearchError::Stage { ref source, .. } if matches!(**source, SearchError::EmptyRoute)
        ));
    }

    #[test]
    fn test_invalid_config_halts_at_loaded() {
        let config = SearchConfig {
            batch_size: 0,
            ..SearchConfig::default()
        };
        let err = Pipeline::new(config)
            .run(vec![RoutePoint::new(0.0, 0.0)], Vec::new())
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Loaded));
    }

    #[test]
    fn test_run_reports_everything() {
        let route: Vec<RoutePoint> = (0..=50).map(|i| RoutePoint::new(0.0, i as f64 * 0.001)).collect();
        let stations = vec![
            RawStation::new("near", "1 Main St", Some(0.002), Some(0.025), Some(3.1)),
            RawStation::new("far", "2 Main St", Some(0.5), Some(0.025), None),
            RawStation::new("broken", "3 Main St", None, Some(0.0), None),
        ];
        let output = Pipeline::new(SearchConfig::default()).run(route, stations).unwrap();

        assert_eq!(output.stations.valid().len(), 2);
        assert_eq!(output.stations.invalid().len(), 1);
        assert_eq!(output.raw_stats.point_count, 51);
        // Collinear points collapse to the two endpoints before densification
        assert_eq!(output.simplified.simplified_points, 2);
        assert!(output.densified_points > 2);
        assert!(output.report.is_consistent());
        assert_eq!(output.primary().algorithm(), Algorithm::KdTree);
        assert_eq!(output.primary().ids().into_iter().collect::<Vec<_>>(), vec!["near"]);
    }
}
