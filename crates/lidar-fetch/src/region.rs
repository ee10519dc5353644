//! Region resolution: map a query to an archive partition.

use crate::{FetchError, Result};
use lidar_catalog::{metadata_url, normalize_identifier, BoundingBox, RegionCatalog};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

/// One-based selector of a partition's published variant.
///
/// Partitions published several times keep one bound set per variant. The
/// selector picks which of them the containment test looks at; variant 1 is
/// the first one recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSelector(usize);

impl VariantSelector {
    /// The first recorded variant.
    pub const FIRST: VariantSelector = VariantSelector(1);

    /// Validate a one-based variant number.
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(FetchError::InvalidVariant(n));
        }
        Ok(Self(n))
    }

    /// One-based variant number.
    pub fn get(&self) -> usize {
        self.0
    }

    fn index(&self) -> usize {
        self.0 - 1
    }
}

impl Default for VariantSelector {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Set of archive folder names a query may name explicitly.
#[derive(Debug, Clone, Default)]
pub struct KnownPartitions {
    names: HashSet<String>,
}

impl KnownPartitions {
    /// Parse a newline-delimited listing. Blank lines are ignored and
    /// trailing `/` is stripped.
    pub fn parse(text: &str) -> Self {
        let names = text
            .lines()
            .map(normalize_identifier)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { names }
    }

    /// Read a listing file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// True if `name` is listed.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(normalize_identifier(name))
    }

    /// Number of listed partitions.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if nothing is listed.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A catalog record whose selected variant contains the query.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionMatch<'a> {
    /// Catalog record name.
    pub name: &'a str,
    /// Year of the selected variant.
    pub year: &'a str,
    /// Access URL of the selected variant.
    pub access_url: &'a str,
    /// Bounds of the selected variant.
    pub bounds: BoundingBox,
}

/// Check an explicitly requested partition against the known list.
pub fn resolve_by_name(name: &str, known: &KnownPartitions) -> Result<String> {
    let name = normalize_identifier(name);
    if known.contains(name) {
        Ok(name.to_string())
    } else {
        Err(FetchError::RegionNotFound(format!("'{}' is not a known partition", name)))
    }
}

/// Access URL of a named partition.
pub fn partition_url(base_url: &str, name: &str) -> String {
    metadata_url(base_url, name)
}

/// First record, in catalog order, whose selected variant fully contains
/// `query`. Records with fewer variants than requested are passed over.
pub fn find_containing<'a>(
    query: &BoundingBox,
    catalog: &'a RegionCatalog,
    variant: VariantSelector,
) -> Option<PartitionMatch<'a>> {
    let i = variant.index();
    catalog.iter().find_map(|record| {
        let candidate = record.bounds().get(i)?;
        if !candidate.contains(query) {
            return None;
        }
        Some(PartitionMatch {
            name: record.name(),
            year: record.years().get(i)?,
            access_url: record.access_urls().get(i)?,
            bounds: *candidate,
        })
    })
}

/// Access URL of the first partition containing `query`.
pub fn resolve_by_bounds(
    query: &BoundingBox,
    catalog: &RegionCatalog,
    variant: VariantSelector,
) -> Result<String> {
    match find_containing(query, catalog, variant) {
        Some(found) => {
            info!("Region found in {}_{} folder", found.name, found.year);
            Ok(found.access_url.to_string())
        }
        None => Err(FetchError::RegionNotFound(format!(
            "no partition (variant {}) contains ({}, {}, {}, {})",
            variant.get(),
            query.minx,
            query.miny,
            query.maxx,
            query.maxy
        ))),
    }
}
