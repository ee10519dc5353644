//! Remote partition metadata (`ept.json`) retrieval.
//!
//! Each archive partition publishes an Entwine Point Tile descriptor at
//! `<base>/<identifier>/ept.json`. Only `bounds` and `points` are consumed.

use crate::{BoundingBox, CatalogError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Public USGS 3DEP LiDAR bucket.
pub const DEFAULT_BASE_URL: &str = "https://usgs-lidar-public.s3.us-west-2.amazonaws.com/";

/// Default HTTP timeout for metadata requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The subset of an `ept.json` document the catalog needs.
#[derive(Debug, Clone, Deserialize)]
pub struct EptMetadata {
    /// Cube `[xmin, ymin, zmin, xmax, ymax, zmax]` in EPSG:3857.
    pub bounds: Vec<f64>,
    /// Total point count.
    pub points: u64,
}

impl EptMetadata {
    /// Parse an `ept.json` body.
    pub fn from_json(url: &str, body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| CatalogError::MetadataFetch {
            url: url.to_string(),
            reason: format!("malformed ept.json: {}", e),
        })
    }
}

/// Source of partition metadata documents.
pub trait MetadataSource {
    /// Fetch and parse the metadata document at `url`.
    fn fetch(&self, url: &str) -> Result<EptMetadata>;
}

/// Fetches `ept.json` documents over HTTP with a blocking client.
pub struct HttpMetadataSource {
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for HttpMetadataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetadataSource").finish()
    }
}

impl HttpMetadataSource {
    /// Create a source with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a source with a specific request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl MetadataSource for HttpMetadataSource {
    fn fetch(&self, url: &str) -> Result<EptMetadata> {
        let response = self.client.get(url).send()?;

        if !response.status().is_success() {
            return Err(CatalogError::MetadataFetch {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let body = response.text()?;
        EptMetadata::from_json(url, &body)
    }
}

/// URL of the `ept.json` document for an archive identifier.
pub fn metadata_url(base_url: &str, identifier: &str) -> String {
    format!(
        "{}/{}/ept.json",
        base_url.trim_end_matches('/'),
        crate::normalize_identifier(identifier)
    )
}

/// Fetch a partition's metadata and extract its bounds and point count.
pub fn fetch_partition_metadata(
    source: &dyn MetadataSource,
    endpoint_url: &str,
) -> Result<(BoundingBox, u64)> {
    let metadata = source.fetch(endpoint_url)?;
    let bounds = BoundingBox::from_ept_bounds(&metadata.bounds).map_err(|e| {
        CatalogError::MetadataFetch {
            url: endpoint_url.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok((bounds, metadata.points))
}
