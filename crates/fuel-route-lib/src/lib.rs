//! Fuel Route Library - Corridor Search for Points of Interest Along a Route
//!
//! This library finds fuel stations lying within a fixed distance of a long,
//! densely-sampled travel route, and cross-validates two independent spatial
//! search strategies against each other for correctness and performance.
//!
//! # Architecture
//!
//! - **[`StationSet`]**: Validated station records, invalid ones kept with a reason
//! - **[`Route`]**: Immutable ordered route points with precomputed spacing statistics
//! - **[`simplify_route`]**: Douglas–Peucker reduction with an explicit work stack
//! - **[`densify_route`]**: Great-circle interpolation bounding the gap between samples
//! - **[`ProximitySearch`]**: One capability, two implementations:
//!   [`KdTreeSearch`] (primary) and [`BufferSearch`] (reference)
//! - **[`Comparator`]**: Runs both searches under scoped instrumentation and diffs results
//! - **[`Pipeline`]**: The linear `Loaded → … → Done` driver tying everything together
//!
//! # Distances
//!
//! Great-circle (Haversine) distance in meters is the correctness reference
//! everywhere. Planar distances in a [`LocalFrame`] are only used to find
//! candidates, which are then re-measured exactly.

mod compare;
mod config;
pub mod instrument;
mod interpolate;
mod pipeline;
mod route;
pub mod search;
mod simplify;
mod station;
pub mod synthetic;
pub mod utils;

// Public API exports
pub use compare::{AlgorithmRun, Comparator, Comparison, ComparisonReport, Divergence};
pub use config::SearchConfig;
pub use interpolate::densify_route;
pub use pipeline::{Pipeline, PipelineOutput, Stage};
pub use route::{Route, RoutePoint, RouteStats};
pub use search::{
    Algorithm, BufferSearch, KdTreeSearch, ProximitySearch, SearchResult, StationMatch,
};
pub use simplify::{SimplificationStats, SimplifiedRoute, simplify_route};
pub use station::{FuelStation, InvalidReason, InvalidStation, RawStation, StationSet};
pub use utils::LocalFrame;

/// Error types for the corridor search core
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Empty route")]
    EmptyRoute,

    #[error("Invalid route point at index {index}: {reason}")]
    InvalidRoute { index: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Pipeline failed during {stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<SearchError>,
    },
}

impl SearchError {
    /// Stage at which a pipeline run halted, if this error came from one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SearchError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
