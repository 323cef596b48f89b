use std::path::PathBuf;

/// Errors surfaced by the command-line tool
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse GPX {}: {source}", path.display())]
    Gpx {
        path: PathBuf,
        #[source]
        source: gpx::errors::GpxError,
    },

    #[error("Failed to parse stations {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode summary: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to render report: {0}")]
    Render(#[from] std::fmt::Error),

    #[error("No track or route points in {}", .0.display())]
    EmptyGpx(PathBuf),

    #[error(transparent)]
    Search(#[from] fuel_route_lib::SearchError),
}

pub type Result<T> = std::result::Result<T, CliError>;
