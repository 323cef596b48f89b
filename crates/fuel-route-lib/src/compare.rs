//! Cross-validation of the two search algorithms
//!
//! The comparator runs every [`Algorithm`] on the same route, stations and
//! radius, measures each run, and diffs the matched station ids. Stations
//! found by only one algorithm are reported as [`Divergence`] entries.

use crate::instrument::{Measurement, Sample};
use crate::search::{Algorithm, SearchResult};
use crate::{FuelStation, Result, Route, SearchConfig};
use std::collections::BTreeSet;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Timing and size of a single algorithm run
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlgorithmRun {
    pub algorithm: Algorithm,
    /// Index construction plus search
    pub elapsed: Duration,
    /// Peak heap growth during the run; `None` when not attributable
    pub peak_memory_bytes: Option<usize>,
    pub station_count: usize,
}

/// A station matched by one algorithm but not the other
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Divergence {
    pub station_id: String,
    pub found_by: Algorithm,
    /// Distance reported by the algorithm that found it
    pub distance_m: f64,
}

/// Timing, memory and set-comparison statistics of one comparison
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparisonReport {
    pub runs: Vec<AlgorithmRun>,
    /// Ids matched by both algorithms
    pub matched: BTreeSet<String>,
    pub only_in_tree: BTreeSet<String>,
    pub only_in_buffer: BTreeSet<String>,
    pub divergence: Vec<Divergence>,
}

impl ComparisonReport {
    /// Build a report from the two results and their measurements
    pub fn from_results(
        tree: &SearchResult,
        tree_sample: Sample,
        buffer: &SearchResult,
        buffer_sample: Sample,
    ) -> Self {
        let tree_ids = tree.ids();
        let buffer_ids = buffer.ids();

        let matched: BTreeSet<String> = tree_ids
            .intersection(&buffer_ids)
            .map(|id| id.to_string())
            .collect();
        let only_in_tree: BTreeSet<String> = tree_ids
            .difference(&buffer_ids)
            .map(|id| id.to_string())
            .collect();
        let only_in_buffer: BTreeSet<String> = buffer_ids
            .difference(&tree_ids)
            .map(|id| id.to_string())
            .collect();

        let mut divergence = Vec::with_capacity(only_in_tree.len() + only_in_buffer.len());
        for (ids, result) in [(&only_in_tree, tree), (&only_in_buffer, buffer)] {
            for id in ids {
                if let Some(m) = result.get(id) {
                    divergence.push(Divergence {
                        station_id: id.clone(),
                        found_by: result.algorithm(),
                        distance_m: m.distance_m,
                    });
                }
            }
        }

        let run = |result: &SearchResult, sample: Sample| AlgorithmRun {
            algorithm: result.algorithm(),
            elapsed: sample.elapsed,
            peak_memory_bytes: sample.peak_memory_bytes,
            station_count: result.len(),
        };

        Self {
            runs: vec![run(tree, tree_sample), run(buffer, buffer_sample)],
            matched,
            only_in_tree,
            only_in_buffer,
            divergence,
        }
    }

    /// True when both algorithms matched exactly the same stations
    pub fn is_consistent(&self) -> bool {
        self.divergence.is_empty()
    }

    /// Measurements of one algorithm
    pub fn run(&self, algorithm: Algorithm) -> Option<&AlgorithmRun> {
        self.runs.iter().find(|r| r.algorithm == algorithm)
    }

    /// How many times faster the tree search was than the buffer search
    pub fn speedup(&self) -> Option<f64> {
        let tree = self.run(Algorithm::KdTree)?.elapsed.as_secs_f64();
        let buffer = self.run(Algorithm::Buffer)?.elapsed.as_secs_f64();
        (tree > 0.0).then(|| buffer / tree)
    }
}

/// Both search results together with their comparison
#[derive(Clone, Debug)]
pub struct Comparison {
    pub tree: SearchResult,
    pub buffer: SearchResult,
    pub report: ComparisonReport,
}

/// Runs both algorithms on identical inputs
pub struct Comparator<'a> {
    config: &'a SearchConfig,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'a> Comparator<'a> {
    pub fn new(config: &'a SearchConfig) -> Self {
        Self { config }
    }

    /// Search `route` for `stations` with both algorithms and diff the results
    pub fn compare(&self, route: &Route, stations: &[FuelStation]) -> Result<Comparison> {
        let radius_m = self.config.radius_m;

        let ((tree, tree_sample), (buffer, buffer_sample)) = if self.config.run_concurrently {
            let (tree, buffer) = rayon::join(
                || self.run(Algorithm::KdTree, route, stations, radius_m, false),
                || self.run(Algorithm::Buffer, route, stations, radius_m, false),
            );
            (tree?, buffer?)
        } else {
            (
                self.run(Algorithm::KdTree, route, stations, radius_m, true)?,
                self.run(Algorithm::Buffer, route, stations, radius_m, true)?,
            )
        };

        let report = ComparisonReport::from_results(&tree, tree_sample, &buffer, buffer_sample);
        for d in &report.divergence {
            tracing::warn!(
                station = %d.station_id,
                found_by = %d.found_by,
                distance_m = d.distance_m,
                "Algorithms disagree on station"
            );
        }
        tracing::info!(
            matched = report.matched.len(),
            only_in_tree = report.only_in_tree.len(),
            only_in_buffer = report.only_in_buffer.len(),
            "Comparison finished"
        );

        Ok(Comparison {
            tree,
            buffer,
            report,
        })
    }

    /// Build and run one algorithm inside a measurement
    fn run(
        &self,
        algorithm: Algorithm,
        route: &Route,
        stations: &[FuelStation],
        radius_m: f64,
        track_memory: bool,
    ) -> Result<(SearchResult, Sample)> {
        let measurement = if track_memory {
            Measurement::start(algorithm.label())
        } else {
            Measurement::start_untracked(algorithm.label())
        };

        let search = algorithm.build(stations, route.frame(), self.config);
        let result = search.search(route, radius_m);
        drop(search);
        let sample = measurement.stop();

        let result = result?;
        tracing::info!(
            algorithm = %algorithm,
            stations = result.len(),
            elapsed_ms = sample.elapsed.as_secs_f64() * 1000.0,
            "Search finished"
        );
        Ok((result, sample))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::METERS_PER_DEGREE;

    fn station(id: &str, lat: f64, lon: f64) -> FuelStation {
        FuelStation {
            id: id.to_string(),
            address: String::new(),
            lat,
            lon,
            price: Some(3.5),
        }
    }

    fn sample(ms: u64) -> Sample {
        Sample {
            elapsed: Duration::from_millis(ms),
            peak_memory_bytes: None,
        }
    }

    #[test]
    fn test_compare_agreeing_algorithms() {
        let route = Route::from_lat_lon(&[(0.0, 0.0), (0.0, 0.01), (0.0, 0.02)]).unwrap();
        let stations = vec![
            station("a", 300.0 / METERS_PER_DEGREE, 0.005),
            station("b", -700.0 / METERS_PER_DEGREE, 0.015),
            station("far", 0.5, 0.01),
        ];
        let config = SearchConfig {
            radius_m: 1000.0,
            ..SearchConfig::default()
        };
        let comparison = Comparator::new(&config).compare(&route, &stations).unwrap();

        assert!(comparison.report.is_consistent());
        assert_eq!(comparison.report.matched.len(), 2);
        assert_eq!(comparison.buffer.len(), 2);
        // Both measure to the route line, not only to its vertices
        assert_eq!(
            comparison.tree.get("a").unwrap().distance_m,
            comparison.buffer.get("a").unwrap().distance_m
        );
        assert!((comparison.tree.get("a").unwrap().distance_m - 300.0).abs() < 1.0);
        assert_eq!(comparison.report.runs.len(), 2);
        assert_eq!(
            comparison.report.run(Algorithm::KdTree).unwrap().station_count,
            2
        );
    }

    #[test]
    fn test_concurrent_run_reports_no_memory() {
        // The station lies on the segment, ~556 m from both vertices
        let route = Route::from_lat_lon(&[(0.0, 0.0), (0.0, 0.01)]).unwrap();
        let stations = vec![station("a", 0.0, 0.005)];
        let config = SearchConfig {
            radius_m: 500.0,
            run_concurrently: true,
            ..SearchConfig::default()
        };
        let comparison = Comparator::new(&config).compare(&route, &stations).unwrap();
        assert!(comparison.report.is_consistent());
        assert!(comparison.tree.contains("a"));
        assert!(comparison.tree.get("a").unwrap().distance_m < 1.0);
        for run in &comparison.report.runs {
            assert_eq!(run.peak_memory_bytes, None);
        }
    }

    #[test]
    fn test_divergence_reported_for_each_side() {
        use crate::search::MatchAccumulator;

        let stations = vec![station("both", 0.0, 0.0), station("tree", 0.0, 0.0), station("buf", 0.0, 0.0)];
        let mut tree = MatchAccumulator::default();
        tree.offer(0, 1.0);
        tree.offer(1, 2.0);
        let mut buffer = MatchAccumulator::default();
        buffer.offer(0, 1.0);
        buffer.offer(2, 3.0);

        let tree = tree.into_result(Algorithm::KdTree, 10.0, &stations);
        let buffer = buffer.into_result(Algorithm::Buffer, 10.0, &stations);
        let report = ComparisonReport::from_results(&tree, sample(4), &buffer, sample(8));

        assert!(!report.is_consistent());
        assert_eq!(report.matched.iter().collect::<Vec<_>>(), vec!["both"]);
        assert_eq!(report.only_in_tree.iter().collect::<Vec<_>>(), vec!["tree"]);
        assert_eq!(report.only_in_buffer.iter().collect::<Vec<_>>(), vec!["buf"]);
        assert_eq!(
            report.divergence,
            vec![
                Divergence {
                    station_id: "tree".to_string(),
                    found_by: Algorithm::KdTree,
                    distance_m: 2.0,
                },
                Divergence {
                    station_id: "buf".to_string(),
                    found_by: Algorithm::Buffer,
                    distance_m: 3.0,
                },
            ]
        );
        assert_eq!(report.speedup(), Some(2.0));
    }

    #[test]
    fn test_search_error_propagates() {
        let route = Route::from_lat_lon(&[(0.0, 0.0)]).unwrap();
        let stations = vec![station("a", 0.0, 0.0)];
        let config = SearchConfig {
            radius_m: -5.0,
            ..SearchConfig::default()
        };
        assert!(Comparator::new(&config).compare(&route, &stations).is_err());
    }
}
