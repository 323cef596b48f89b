use clap::Parser;
use fuel_route_lib::{Algorithm, SearchConfig, utils};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Fuel Route Finder - Find fuel stations along a route and cross-check two spatial searches
pub struct Settings {
    /// GPX file with the route (track points, or route points if there are no tracks).
    /// A synthetic route is generated when omitted.
    #[clap(short, long, value_name = "FILE")]
    pub route: Option<PathBuf>,

    /// JSON array of station records. Synthetic stations are generated when omitted.
    #[clap(short, long, value_name = "FILE")]
    pub stations: Option<PathBuf>,

    /// Search distance from the route in miles
    #[clap(short, long, default_value = "1.0")]
    pub distance: f64,

    /// Simplification tolerance in degrees (0.0002° is about 22 m)
    #[clap(long, default_value = "0.0002")]
    pub simplify: f64,

    /// Maximum gap between query points in meters (default: half the search distance)
    #[clap(long, value_name = "METERS")]
    pub max_gap: Option<f64>,

    /// Route points per tree-search batch
    #[clap(long, default_value = "1000")]
    pub batch_size: usize,

    /// Process tree-search batches in parallel
    #[clap(long, default_value = "false")]
    pub parallel: bool,

    /// Run both algorithms at the same time (peak memory is then not reported)
    #[clap(long, default_value = "false")]
    pub concurrent: bool,

    /// Estimated memory budget for a single batch, in bytes
    #[clap(long, value_name = "BYTES")]
    pub memory_budget: Option<usize>,

    /// Use the buffer search result as the primary answer
    #[clap(long, default_value = "false")]
    pub buffer_primary: bool,

    /// Number of points in the synthetic route
    #[clap(long, default_value = "200000")]
    pub synthetic_points: usize,

    /// Number of synthetic station records
    #[clap(long, default_value = "5000")]
    pub synthetic_stations: usize,

    /// Seed for synthetic data
    #[clap(long, default_value = "42")]
    pub seed: u64,

    /// Number of matched stations to print
    #[clap(long, default_value = "10")]
    pub show: usize,

    /// Print a JSON summary instead of tables
    #[clap(long, default_value = "false")]
    pub json: bool,
}

impl Settings {
    /// Library configuration derived from the command line
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            simplify_tolerance_m: utils::degrees_to_meters(self.simplify),
            max_gap_m: self.max_gap,
            batch_size: self.batch_size,
            parallel_batches: self.parallel,
            batch_memory_budget_bytes: self.memory_budget,
            run_concurrently: self.concurrent,
            primary: if self.buffer_primary {
                Algorithm::Buffer
            } else {
                Algorithm::KdTree
            },
            ..SearchConfig::with_radius_miles(self.distance)
        }
    }
}
