//! # lidar-catalog
//!
//! Partition catalog for the USGS 3DEP LiDAR archive published on AWS as
//! Entwine Point Tiles.
//!
//! The archive is a flat list of folders, each holding one partition variant
//! with an `ept.json` descriptor. This crate:
//! - infers a logical partition name and year from every folder identifier
//! - fetches each descriptor and records its bounds and point count
//! - groups variants under their logical name and merges partitions that were
//!   re-published under several names with identical bounds
//! - exports the result as tabular rows and persists it as JSON
//!
//! ## Example
//!
//! ```no_run
//! use lidar_catalog::{
//!     build_catalog, merge_equal_bounds, save_catalog, ConsolidationConfig, HttpMetadataSource,
//! };
//!
//! let identifiers = ["IA_FullState/", "USGS_LPC_IA_Central_2019/"];
//! let source = HttpMetadataSource::new()?;
//! let report = build_catalog(&identifiers, &source, &ConsolidationConfig::default());
//! let catalog = merge_equal_bounds(report.catalog)?;
//! save_catalog(&catalog, "aws_dataset.json")?;
//! # Ok::<(), lidar_catalog::CatalogError>(())
//! ```

mod bounds;
mod catalog;
mod consolidate;
mod error;
mod identifier;
mod metadata;

pub use bounds::BoundingBox;
pub use catalog::{export, load_catalog, save_catalog, CatalogRow, PartitionRecord, RegionCatalog, Variant};
pub use consolidate::{
    build_catalog, merge_equal_bounds, ConsolidationConfig, ConsolidationReport, SkippedEndpoint,
    DEFAULT_PAUSE, DEFAULT_RATE_LIMIT_EVERY,
};
pub use error::CatalogError;
pub use identifier::{infer_partition_key, normalize_identifier, PartitionKey};
pub use metadata::{
    fetch_partition_metadata, metadata_url, EptMetadata, HttpMetadataSource, MetadataSource,
    DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT,
};

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
