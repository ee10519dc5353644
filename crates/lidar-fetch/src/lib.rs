//! # lidar-fetch
//!
//! Polygon-driven point extraction from the USGS 3DEP LiDAR archive.
//!
//! A query polygon is projected to the archive's working CRS (EPSG:3857),
//! resolved to a partition (by name or through the region catalog), turned
//! into a five-stage extraction pipeline and run on a point cloud engine.
//! The returned points are tagged with their elevation.
//!
//! ## Example
//!
//! ```no_run
//! use geo::polygon;
//! use lidar_fetch::{
//!     DataFetcher, Epsg, FetcherSettings, KnownPartitions, PdalEngine, PipelineTemplate,
//!     RegionSelection,
//! };
//!
//! let catalog = lidar_catalog::load_catalog("aws_dataset.json")?;
//! let fetcher = DataFetcher::new(
//!     FetcherSettings::default(),
//!     catalog,
//!     KnownPartitions::default(),
//!     PipelineTemplate::load("templates/pipeline.json")?,
//!     PdalEngine::default(),
//! );
//!
//! let field = polygon![
//!     (x: -93.756155, y: 41.918015),
//!     (x: -93.756155, y: 41.921429),
//!     (x: -93.747334, y: 41.921429),
//!     (x: -93.747334, y: 41.918015),
//! ];
//! let query = fetcher.prepare(&field, Epsg::WGS84, &RegionSelection::default())?;
//! let output = fetcher.fetch(&query)?;
//! println!("{} points", output.dataset.len());
//! # Ok::<(), lidar_fetch::FetchError>(())
//! ```

mod elevation;
mod error;
mod executor;
mod fetcher;
mod geometry;
mod pipeline;
mod region;
mod template;

pub use elevation::{to_elevation_dataset, ElevationDataset, ElevationRecord, PointCloud};
pub use error::{FetchError, GeometryError};
pub use executor::{execute, parse_text_output, PdalEngine, PointCloudEngine, RawPoints};
pub use fetcher::{DataFetcher, FetchOutput, FetcherSettings, QueryContext, RegionSelection};
pub use geometry::{project, project_point, CropBoundary, Epsg, Projector, WORKING_CRS};
pub use pipeline::{
    build_pipeline, AssignStage, CropStage, ExtractionPipeline, RangeStage, ReaderStage,
    ReprojectionStage, Stage, StageKind,
};
pub use region::{
    find_containing, partition_url, resolve_by_bounds, resolve_by_name, KnownPartitions,
    PartitionMatch, VariantSelector,
};
pub use template::{PipelineTemplate, StageOptions, StageTemplate};

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, FetchError>;
