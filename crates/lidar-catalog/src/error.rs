//! Error types for the catalog crate.

use thiserror::Error;

/// Errors that can occur while building, loading or querying the partition catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// I/O error reading or writing a catalog file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error when fetching partition metadata.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Remote metadata endpoint was unreachable or returned a malformed document.
    #[error("Failed to fetch metadata from {url}: {reason}")]
    MetadataFetch {
        /// Endpoint URL.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Identifier cannot be split into a partition name and year.
    #[error("Invalid partition identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Bounds array has the wrong arity or is not ordered min <= max.
    #[error("Invalid bounds {values:?}: {reason}")]
    InvalidBounds {
        /// Raw values that were rejected.
        values: Vec<f64>,
        /// Why they were rejected.
        reason: String,
    },

    /// Parallel per-variant lists of a record have different lengths.
    #[error(
        "Inconsistent record '{name}': {bounds} bounds, {years} years, {access_urls} urls, {point_counts} point counts, {variations} variations"
    )]
    InconsistentRecord {
        /// Partition name.
        name: String,
        /// Number of bound entries.
        bounds: usize,
        /// Number of years.
        years: usize,
        /// Number of access URLs.
        access_urls: usize,
        /// Number of point counts.
        point_counts: usize,
        /// Declared variation count.
        variations: usize,
    },

    /// The same partition name occurs twice in an imported catalog.
    #[error("Duplicate region '{0}' in catalog")]
    DuplicateRegion(String),
}
