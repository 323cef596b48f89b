//! Fuel Route Finder - command-line entry point
//!
//! Loads a route and station records (or generates synthetic ones), runs the
//! corridor search pipeline with both algorithms, and prints the route
//! analysis, the algorithm comparison and the closest stations.

mod error;
mod input;
mod logging;
mod report;
mod settings;

use clap::Parser;
use fuel_route_lib::Pipeline;
use fuel_route_lib::instrument::TrackingAllocator;
use std::process::ExitCode;

use crate::error::Result;
use crate::settings::Settings;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

fn run(settings: &Settings) -> Result<String> {
    let config = settings.search_config();
    tracing::info!(
        radius_m = config.radius_m,
        simplify_tolerance_m = config.simplify_tolerance_m,
        max_gap_m = config.effective_max_gap(),
        batch_size = config.batch_size,
        "Search configuration"
    );

    let route = input::load_route(settings)?;
    let stations = input::load_stations(settings, &route)?;
    let output = Pipeline::new(config).run(route, stations)?;

    if settings.json {
        return Ok(report::render_json(&output, settings.show)?);
    }
    Ok(report::render(&output, settings.show)?)
}

fn main() -> ExitCode {
    let settings = Settings::parse();
    let _profiling: logging::ProfilingGuard = logging::setup_logging_and_profiling();

    match run(&settings) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
