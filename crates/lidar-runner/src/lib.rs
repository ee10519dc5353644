//! # lidar-runner
//!
//! The `lidar` command: builds the partition catalog from the public archive
//! and extracts elevation points for a polygon.
//!
//! ```text
//! lidar catalog build --identifiers filenames.txt --output aws_dataset.json
//! lidar catalog merge --input aws_dataset.json --output merged.json
//! lidar fetch --bbox -93.756155,41.918015,-93.747334,41.921429 --output field.geojson
//! ```

pub mod commands;
pub mod config;
mod error;
pub mod polygon;

pub use commands::{run, Cli};
pub use config::RunnerConfig;
pub use error::RunnerError;

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
