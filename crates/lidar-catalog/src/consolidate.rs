//! Catalog consolidation: fetch every partition's metadata, group variants
//! under their logical names and fold together partitions re-published under
//! several names.

use crate::catalog::{RegionCatalog, Variant};
use crate::identifier::infer_partition_key;
use crate::metadata::{fetch_partition_metadata, metadata_url, MetadataSource, DEFAULT_BASE_URL};
use crate::{CatalogError, PartitionRecord};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default number of fetches between throttle pauses.
pub const DEFAULT_RATE_LIMIT_EVERY: usize = 100;

/// Default throttle pause.
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(5);

/// Settings for a consolidation run.
#[derive(Debug, Clone)]
pub struct ConsolidationConfig {
    /// Base URL the identifiers are resolved against.
    pub base_url: String,
    /// Pause after this many fetch attempts (0 disables throttling).
    pub rate_limit_every: usize,
    /// Length of each pause.
    pub pause: Duration,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limit_every: DEFAULT_RATE_LIMIT_EVERY,
            pause: DEFAULT_PAUSE,
        }
    }
}

/// An identifier that was skipped and why.
#[derive(Debug)]
pub struct SkippedEndpoint {
    /// Position in the input list.
    pub index: usize,
    /// Identifier as given.
    pub identifier: String,
    /// Failure that caused the skip.
    pub error: CatalogError,
}

/// Outcome of [`build_catalog`].
#[derive(Debug)]
pub struct ConsolidationReport {
    /// The catalog built from every successful fetch.
    pub catalog: RegionCatalog,
    /// Number of metadata documents fetched successfully.
    pub fetched: usize,
    /// Identifiers that failed and were skipped.
    pub skipped: Vec<SkippedEndpoint>,
    /// Number of throttle pauses taken.
    pub pauses: usize,
}

/// Build a catalog by fetching the metadata of every identifier in order.
///
/// Per-identifier failures are logged and skipped; the run always completes.
/// Requests are strictly sequential with a pause after every
/// `rate_limit_every` attempts.
pub fn build_catalog<S: AsRef<str>>(
    identifiers: &[S],
    source: &dyn MetadataSource,
    config: &ConsolidationConfig,
) -> ConsolidationReport {
    let mut catalog = RegionCatalog::new();
    let mut fetched = 0;
    let mut skipped = Vec::new();
    let mut pauses = 0;
    let total = identifiers.len();

    info!("Consolidating metadata for {} identifiers", total);

    for (index, identifier) in identifiers.iter().enumerate() {
        let identifier = identifier.as_ref();

        match fetch_variant(identifier, source, &config.base_url) {
            Ok((name, variant)) => {
                debug!("[{}/{}] {} -> {} ({})", index + 1, total, identifier, name, variant.year);
                catalog.add_variant(&name, variant);
                fetched += 1;
            }
            Err(error) => {
                warn!("Failed to retrieve identifier #{} '{}': {}", index, identifier, error);
                skipped.push(SkippedEndpoint {
                    index,
                    identifier: identifier.to_string(),
                    error,
                });
            }
        }

        let attempted = index + 1;
        if config.rate_limit_every > 0 && attempted % config.rate_limit_every == 0 && attempted < total {
            debug!("Pausing {:?} after {} requests", config.pause, attempted);
            std::thread::sleep(config.pause);
            pauses += 1;
        }
    }

    info!(
        "Consolidated {} partitions from {} identifiers ({} skipped)",
        catalog.len(),
        fetched,
        skipped.len()
    );

    ConsolidationReport {
        catalog,
        fetched,
        skipped,
        pauses,
    }
}

fn fetch_variant(
    identifier: &str,
    source: &dyn MetadataSource,
    base_url: &str,
) -> crate::Result<(String, Variant)> {
    let key = infer_partition_key(identifier)?;
    let url = metadata_url(base_url, identifier);
    let (bounds, point_count) = fetch_partition_metadata(source, &url)?;
    Ok((
        key.name,
        Variant {
            bounds,
            year: key.year,
            access_url: url,
            point_count,
        },
    ))
}

/// Merge partitions whose complete bound lists are identical.
///
/// The merged record is named after its members joined by `,`, concatenates
/// their variant lists and takes the catalog position of its first member.
/// Merging repeats until no two records share a bound list, so applying this
/// to its own output changes nothing.
///
/// Names containing `,` are reserved for merged records. Identifier
/// inference never produces one, but a catalog loaded from a file may; if a
/// joined name equals an existing record's name the merge fails with
/// [`CatalogError::DuplicateRegion`].
pub fn merge_equal_bounds(catalog: RegionCatalog) -> crate::Result<RegionCatalog> {
    let mut records = catalog.into_records();
    loop {
        let (merged, changed) = merge_pass(records);
        records = merged;
        if !changed {
            break;
        }
    }

    RegionCatalog::from_records(records)
}

fn merge_pass(records: Vec<PartitionRecord>) -> (Vec<PartitionRecord>, bool) {
    let mut groups: Vec<PartitionRecord> = Vec::with_capacity(records.len());
    let mut by_bounds: HashMap<Vec<[u64; 4]>, usize> = HashMap::new();
    let mut changed = false;

    for record in records {
        let key: Vec<[u64; 4]> = record.bounds().iter().map(|b| b.bit_key()).collect();
        match by_bounds.get(&key) {
            Some(&i) => {
                debug!("Merging '{}' into '{}'", record.name(), groups[i].name());
                groups[i].absorb(record);
                changed = true;
            }
            None => {
                by_bounds.insert(key, groups.len());
                groups.push(record);
            }
        }
    }

    (groups, changed)
}
