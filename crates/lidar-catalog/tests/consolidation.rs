//! Integration tests for catalog consolidation and persistence.
//!
//! Metadata is served from memory; no network access is required.

use std::collections::HashMap;
use std::time::Duration;

use lidar_catalog::{
    build_catalog, load_catalog, merge_equal_bounds, save_catalog, CatalogError, ConsolidationConfig,
    EptMetadata, MetadataSource, RegionCatalog,
};

const BASE_URL: &str = "https://archive.test/";

/// In-memory stand-in for the public bucket.
struct FakeArchive {
    documents: HashMap<String, String>,
}

impl FakeArchive {
    fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            documents: entries
                .iter()
                .map(|(id, body)| (format!("https://archive.test/{id}/ept.json"), body.to_string()))
                .collect(),
        }
    }
}

impl MetadataSource for FakeArchive {
    fn fetch(&self, url: &str) -> lidar_catalog::Result<EptMetadata> {
        match self.documents.get(url) {
            Some(body) => EptMetadata::from_json(url, body),
            None => Err(CatalogError::MetadataFetch {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            }),
        }
    }
}

fn archive() -> FakeArchive {
    FakeArchive::new(&[
        (
            "IA_FullState",
            r#"{"bounds":[-10796577,4902908,-9999,-10015953,5401502,9999],"points":207245391598}"#,
        ),
        (
            "IA_Statewide_2019",
            r#"{"bounds":[-10796577,4902908,-9999,-10015953,5401502,9999],"points":207245391598}"#,
        ),
        (
            "USGS_LPC_MN_North_2011",
            r#"{"bounds":[-10800000,5900000,0,-10700000,6000000,500],"points":1200000}"#,
        ),
        (
            "USGS_LPC_MN_North_2016",
            r#"{"bounds":[-10810000,5890000,0,-10690000,6010000,500],"points":3400000}"#,
        ),
        (
            "TX_Central_B1_2017_LAS_2019",
            r#"{"bounds":[-10900000,3500000,0,-10800000,3600000,300],"points":5000}"#,
        ),
        ("Broken_2020", r#"{"bounds":"not an array","points":1}"#),
    ])
}

fn config() -> ConsolidationConfig {
    ConsolidationConfig {
        base_url: BASE_URL.to_string(),
        rate_limit_every: 3,
        pause: Duration::ZERO,
    }
}

fn identifiers() -> Vec<String> {
    [
        "IA_FullState/",
        "IA_Statewide_2019/",
        "USGS_LPC_MN_North_2011/",
        "Broken_2020/",
        "USGS_LPC_MN_North_2016/",
        "Unlisted_2000/",
        "TX_Central_B1_2017_LAS_2019/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[test]
fn test_build_and_merge_catalog() {
    let report = build_catalog(&identifiers(), &archive(), &config());

    assert_eq!(report.fetched, 5);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(report.pauses, 2);

    let names: Vec<&str> = report.catalog.iter().map(|r| r.name()).collect();
    assert_eq!(names, ["IA", "IA_Statewide", "USGS_LPC_MN_North", "TX_Central_B1"]);

    let mn = report.catalog.get("USGS_LPC_MN_North").unwrap();
    assert_eq!(mn.variation_count(), 2);
    assert_eq!(mn.point_counts(), [1_200_000, 3_400_000]);

    let merged = merge_equal_bounds(report.catalog).unwrap();
    let names: Vec<&str> = merged.iter().map(|r| r.name()).collect();
    assert_eq!(names, ["IA,IA_Statewide", "USGS_LPC_MN_North", "TX_Central_B1"]);

    let ia = merged.records().first().unwrap();
    assert_eq!(ia.years(), ["FullState", "2019"]);
    assert_eq!(
        ia.access_urls(),
        [
            "https://archive.test/IA_FullState/ept.json",
            "https://archive.test/IA_Statewide_2019/ept.json",
        ]
    );

    let tx = merged.get("TX_Central_B1").unwrap();
    assert_eq!(tx.years(), ["2017-2019"]);
}

#[test]
fn test_catalog_survives_save_and_load() {
    let report = build_catalog(&identifiers(), &archive(), &config());
    let catalog = merge_equal_bounds(report.catalog).unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("catalog").join("aws_dataset.json");
    save_catalog(&catalog, &path).unwrap();
    let loaded: RegionCatalog = load_catalog(&path).unwrap();

    assert_eq!(loaded.len(), catalog.len());
    for original in catalog.iter() {
        let reloaded = loaded.get(original.name()).unwrap();
        assert_eq!(reloaded.bounds(), original.bounds());
        assert_eq!(reloaded.years(), original.years());
        assert_eq!(reloaded.access_urls(), original.access_urls());
        assert_eq!(reloaded.point_counts(), original.point_counts());
        assert_eq!(reloaded.variation_count(), original.variation_count());
    }
    let order: Vec<&str> = loaded.iter().map(|r| r.name()).collect();
    let expected: Vec<&str> = catalog.iter().map(|r| r.name()).collect();
    assert_eq!(order, expected);
}

#[test]
fn test_load_rejects_inconsistent_rows() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"[{"Region":"X","Bounds":[[0,0,1,1]],"NumberOfPoints":[1,2],"Years":["2010"],"AccessUrls":["u"],"Variations":1}]"#,
    )
    .unwrap();

    assert!(matches!(
        load_catalog(&path),
        Err(CatalogError::InconsistentRecord { .. })
    ));
}
