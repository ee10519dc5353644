//! In-memory partition catalog and its tabular interchange form.

use crate::{BoundingBox, CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// One published variant of a partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    /// Bounds in EPSG:3857.
    pub bounds: BoundingBox,
    /// Year (or year span) of the publication.
    pub year: String,
    /// URL of the variant's `ept.json`.
    pub access_url: String,
    /// Number of points in the variant.
    pub point_count: u64,
}

/// One catalog row: a logical partition and all of its variants.
///
/// The per-variant lists are kept parallel; every constructor enforces
/// `bounds.len() == years.len() == access_urls.len() == point_counts.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRecord {
    name: String,
    bounds: Vec<BoundingBox>,
    years: Vec<String>,
    access_urls: Vec<String>,
    point_counts: Vec<u64>,
}

impl PartitionRecord {
    /// Create a record holding a single variant.
    pub fn new(name: impl Into<String>, variant: Variant) -> Self {
        Self {
            name: name.into(),
            bounds: vec![variant.bounds],
            years: vec![variant.year],
            access_urls: vec![variant.access_url],
            point_counts: vec![variant.point_count],
        }
    }

    /// Create a record from parallel lists, checking they line up.
    pub fn from_parts(
        name: impl Into<String>,
        bounds: Vec<BoundingBox>,
        years: Vec<String>,
        access_urls: Vec<String>,
        point_counts: Vec<u64>,
    ) -> Result<Self> {
        let record = Self {
            name: name.into(),
            bounds,
            years,
            access_urls,
            point_counts,
        };
        record.validate(record.years.len())?;
        Ok(record)
    }

    fn validate(&self, variations: usize) -> Result<()> {
        let n = self.bounds.len();
        let consistent = n > 0
            && self.years.len() == n
            && self.access_urls.len() == n
            && self.point_counts.len() == n
            && variations == n;
        if consistent {
            Ok(())
        } else {
            Err(CatalogError::InconsistentRecord {
                name: self.name.clone(),
                bounds: self.bounds.len(),
                years: self.years.len(),
                access_urls: self.access_urls.len(),
                point_counts: self.point_counts.len(),
                variations,
            })
        }
    }

    /// Append another published variant.
    pub fn push_variant(&mut self, variant: Variant) {
        self.bounds.push(variant.bounds);
        self.years.push(variant.year);
        self.access_urls.push(variant.access_url);
        self.point_counts.push(variant.point_count);
    }

    /// Append all variants of `other`, keeping their order.
    pub(crate) fn absorb(&mut self, other: PartitionRecord) {
        self.name.push(',');
        self.name.push_str(&other.name);
        self.bounds.extend(other.bounds);
        self.years.extend(other.years);
        self.access_urls.extend(other.access_urls);
        self.point_counts.extend(other.point_counts);
    }

    /// Partition name (comma-separated list of names after merging).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bounds of every variant.
    pub fn bounds(&self) -> &[BoundingBox] {
        &self.bounds
    }

    /// Year of every variant.
    pub fn years(&self) -> &[String] {
        &self.years
    }

    /// Access URL of every variant.
    pub fn access_urls(&self) -> &[String] {
        &self.access_urls
    }

    /// Point count of every variant.
    pub fn point_counts(&self) -> &[u64] {
        &self.point_counts
    }

    /// Number of published variants.
    pub fn variation_count(&self) -> usize {
        self.years.len()
    }

    /// Variant at a zero-based position.
    pub fn variant(&self, index: usize) -> Option<Variant> {
        Some(Variant {
            bounds: *self.bounds.get(index)?,
            year: self.years.get(index)?.clone(),
            access_url: self.access_urls.get(index)?.clone(),
            point_count: *self.point_counts.get(index)?,
        })
    }
}

/// Partition table keyed by name, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionCatalog {
    records: Vec<PartitionRecord>,
    index: HashMap<String, usize>,
}

impl RegionCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from records, rejecting duplicate names.
    pub fn from_records(records: Vec<PartitionRecord>) -> Result<Self> {
        let mut catalog = Self::new();
        for record in records {
            if catalog.index.contains_key(record.name()) {
                return Err(CatalogError::DuplicateRegion(record.name().to_string()));
            }
            catalog.index.insert(record.name.clone(), catalog.records.len());
            catalog.records.push(record);
        }
        Ok(catalog)
    }

    /// Add a variant under `name`, creating the record on first sight.
    pub(crate) fn add_variant(&mut self, name: &str, variant: Variant) {
        match self.index.get(name) {
            Some(&i) => self.records[i].push_variant(variant),
            None => {
                self.index.insert(name.to_string(), self.records.len());
                self.records.push(PartitionRecord::new(name, variant));
            }
        }
    }

    /// Look up a record by name.
    pub fn get(&self, name: &str) -> Option<&PartitionRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    /// Records in catalog order.
    pub fn records(&self) -> &[PartitionRecord] {
        &self.records
    }

    /// Iterate records in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &PartitionRecord> {
        self.records.iter()
    }

    /// Number of partitions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the catalog holds no partitions.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn into_records(self) -> Vec<PartitionRecord> {
        self.records
    }

    /// Rebuild a catalog from interchange rows.
    pub fn from_rows(rows: Vec<CatalogRow>) -> Result<Self> {
        let records = rows
            .into_iter()
            .map(|row| {
                let record = PartitionRecord {
                    name: row.region,
                    bounds: row.bounds,
                    years: row.years,
                    access_urls: row.access_urls,
                    point_counts: row.number_of_points,
                };
                record.validate(row.variations)?;
                Ok(record)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_records(records)
    }
}

/// Flat row of the persisted catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    /// Partition name.
    #[serde(rename = "Region")]
    pub region: String,
    /// One `[minx, miny, maxx, maxy]` array per variant.
    #[serde(rename = "Bounds")]
    pub bounds: Vec<BoundingBox>,
    /// Point count per variant.
    #[serde(rename = "NumberOfPoints")]
    pub number_of_points: Vec<u64>,
    /// Year per variant.
    #[serde(rename = "Years")]
    pub years: Vec<String>,
    /// `ept.json` URL per variant.
    #[serde(rename = "AccessUrls")]
    pub access_urls: Vec<String>,
    /// Number of variants.
    #[serde(rename = "Variations")]
    pub variations: usize,
}

/// Flatten a catalog into rows for persistence.
pub fn export(catalog: &RegionCatalog) -> Vec<CatalogRow> {
    catalog
        .iter()
        .map(|r| CatalogRow {
            region: r.name.clone(),
            bounds: r.bounds.clone(),
            number_of_points: r.point_counts.clone(),
            years: r.years.clone(),
            access_urls: r.access_urls.clone(),
            variations: r.variation_count(),
        })
        .collect()
}

/// Write a catalog as a pretty-printed JSON array of rows.
pub fn save_catalog<P: AsRef<Path>>(catalog: &RegionCatalog, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(writer, &export(catalog))?;
    Ok(())
}

/// Read a catalog written by [`save_catalog`].
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<RegionCatalog> {
    let reader = BufReader::new(fs::File::open(path)?);
    let rows: Vec<CatalogRow> = serde_json::from_reader(reader)?;
    RegionCatalog::from_rows(rows)
}
