//! Error types for the extraction crate.

use thiserror::Error;

/// Errors raised while turning a query polygon into a bounding box and crop
/// boundary.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Polygon ring has fewer than three distinct vertices.
    #[error("Polygon needs at least 3 distinct vertices, found {0}")]
    TooFewVertices(usize),

    /// Polygon has a NaN or infinite coordinate.
    #[error("Polygon has a non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },

    /// EPSG code is not in the CRS database.
    #[error("EPSG:{0} is not a supported coordinate reference system")]
    UnknownCrs(u16),

    /// Reprojection failed.
    #[error("Projection from EPSG:{from} to EPSG:{to} failed: {reason}")]
    Projection {
        /// Source EPSG code.
        from: u16,
        /// Target EPSG code.
        to: u16,
        /// Reason reported by the projection library.
        reason: String,
    },

    /// Projected coordinates do not form a valid bounding box.
    #[error("Projected bounds are invalid: {0}")]
    InvalidBounds(String),
}

/// Errors that can occur while resolving and extracting a query.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Invalid or unprojectable polygon.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// No catalog entry contains or matches the query.
    #[error("Region not available: {0}")]
    RegionNotFound(String),

    /// Variant selector outside the accepted range.
    #[error("Invalid variant {0} (variants are numbered from 1)")]
    InvalidVariant(usize),

    /// The point cloud engine failed or returned no usable points.
    #[error("Pipeline execution failed: {0}")]
    PipelineExecution(String),

    /// Pipeline stage template is missing or malformed.
    #[error("Failed to load pipeline template: {0}")]
    TemplateLoad(String),

    /// Catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] lidar_catalog::CatalogError),

    /// I/O error reading an input file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
