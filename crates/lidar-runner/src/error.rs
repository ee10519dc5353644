//! Runner error type.

use thiserror::Error;

/// Errors surfaced by the `lidar` command.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Configuration file could not be parsed.
    #[error("Invalid configuration {path}: {source}")]
    Config {
        /// Path of the configuration file.
        path: String,
        /// Parser error.
        source: serde_yaml::Error,
    },

    /// Query polygon could not be read.
    #[error("Invalid polygon: {0}")]
    Polygon(String),

    /// Command line arguments are inconsistent.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    #[error("{0}")]
    Catalog(#[from] lidar_catalog::CatalogError),

    #[error("{0}")]
    Fetch(#[from] lidar_fetch::FetchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
