/*!
Logging and profiling setup for the command-line tool.

Two implementations share one API:

- real: compiled with `feature = "profiling"`. Adds a tracing-chrome layer
  that records `profiling` scopes to a `trace-*.json` file, flushed when the
  returned guard is dropped.
- stub: logging only.

`RUST_LOG` defaults to `info` when unset.
*/

fn default_log_filter() {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var("RUST_LOG", "info,fuel_route_lib=debug");
            } else {
                std::env::set_var("RUST_LOG", "info");
            }
        }
    }
}

#[cfg(feature = "profiling")]
mod inner {
    use tracing_chrome::{ChromeLayerBuilder, FlushGuard};
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    /// Keeps the trace file open; dropping it flushes the trace
    pub struct ProfilingGuard(#[allow(dead_code)] FlushGuard);

    pub fn setup_logging_and_profiling() -> ProfilingGuard {
        super::default_log_filter();

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::from_default_env());
        let (chrome_layer, guard) = ChromeLayerBuilder::new().include_args(true).build();

        tracing_subscriber::registry()
            .with(chrome_layer)
            .with(fmt_layer)
            .init();

        tracing::info!("Tracing initialized with chrome profiling layer");
        ProfilingGuard(guard)
    }
}

#[cfg(not(feature = "profiling"))]
mod inner {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    /// Placeholder so callers hold a guard in every build
    pub struct ProfilingGuard;

    pub fn setup_logging_and_profiling() -> ProfilingGuard {
        super::default_log_filter();

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::from_default_env());
        tracing_subscriber::registry().with(fmt_layer).init();

        tracing::debug!("Logging initialized (profiling disabled in this build)");
        ProfilingGuard
    }
}

pub use inner::{ProfilingGuard, setup_logging_and_profiling};
