//! Search configuration

use crate::search::Algorithm;
use crate::utils;
use crate::{Result, SearchError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for one corridor search run
///
/// All distances are meters. The defaults mirror a one-mile corridor around a
/// route simplified at roughly 0.0002° (about 22 m).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchConfig {
    /// Corridor half-width: stations at most this far from the route match.
    /// Inclusive. Default: 1 mile.
    pub radius_m: f64,
    /// Douglas–Peucker tolerance. Zero or negative disables simplification.
    pub simplify_tolerance_m: f64,
    /// Maximum gap between consecutive query points after densification.
    /// `None` uses half of `radius_m`.
    pub max_gap_m: Option<f64>,
    /// Number of route points per tree-search batch
    pub batch_size: usize,
    /// Process tree-search batches on the rayon pool
    pub parallel_batches: bool,
    /// Upper bound for the estimated working set of a single batch. When
    /// exceeded the batch size is reduced instead of failing the run.
    pub batch_memory_budget_bytes: Option<usize>,
    /// Run both algorithms at the same time in the comparator.
    /// Per-algorithm peak memory is not reported in this mode.
    pub run_concurrently: bool,
    /// Algorithm whose result is treated as the primary answer
    pub primary: Algorithm,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius_m: utils::miles_to_meters(1.0),
            simplify_tolerance_m: utils::degrees_to_meters(0.0002),
            max_gap_m: None,
            batch_size: 1000,
            parallel_batches: false,
            batch_memory_budget_bytes: None,
            run_concurrently: false,
            primary: Algorithm::KdTree,
        }
    }
}

impl SearchConfig {
    /// Convenience constructor for a radius given in miles
    pub fn with_radius_miles(miles: f64) -> Self {
        Self {
            radius_m: utils::miles_to_meters(miles),
            ..Self::default()
        }
    }

    /// Effective maximum gap used by the interpolator
    #[inline]
    pub fn effective_max_gap(&self) -> f64 {
        self.max_gap_m.unwrap_or(self.radius_m / 2.0)
    }

    /// Check that the configuration describes a runnable search
    pub fn validate(&self) -> Result<()> {
        if !self.radius_m.is_finite() || self.radius_m < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "radius must be a non-negative distance, got {}",
                self.radius_m
            )));
        }
        if self.simplify_tolerance_m.is_nan() {
            return Err(SearchError::InvalidConfig(
                "simplification tolerance is NaN".to_string(),
            ));
        }
        let gap = self.effective_max_gap();
        if !gap.is_finite() || gap <= 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "maximum gap must be a positive distance, got {gap}"
            )));
        }
        if gap > self.radius_m {
            tracing::warn!(
                max_gap_m = gap,
                radius_m = self.radius_m,
                "Maximum gap exceeds the radius; tree queries will cover a wide area around each point"
            );
        }
        if self.batch_size == 0 {
            return Err(SearchError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
