//! Runner tests that exercise commands end to end on local files.

use std::fs;

use clap::Parser;
use lidar_catalog::{load_catalog, save_catalog, BoundingBox, PartitionRecord, RegionCatalog};
use lidar_runner::{run, Cli, RunnerError};

fn record(name: &str, bounds: BoundingBox, year: &str) -> PartitionRecord {
    PartitionRecord::from_parts(
        name,
        vec![bounds],
        vec![year.to_string()],
        vec![format!("https://archive.test/{name}_{year}/ept.json")],
        vec![1_000],
    )
    .unwrap()
}

#[test]
fn test_catalog_merge_command() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("catalog.json");
    let output = dir.path().join("out/merged.json");

    let shared = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
    let other = BoundingBox::new(20.0, 20.0, 30.0, 30.0).unwrap();
    let catalog = RegionCatalog::from_records(vec![
        record("IA", shared, "FullState"),
        record("Other", other, "2018"),
        record("IA_Statewide", shared, "2019"),
    ])
    .unwrap();
    save_catalog(&catalog, &input).unwrap();

    let cli = Cli::try_parse_from([
        "lidar",
        "catalog",
        "merge",
        "--input",
        input.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ])
    .unwrap();
    run(cli).unwrap();

    let merged = load_catalog(&output).unwrap();
    let names: Vec<&str> = merged.iter().map(|r| r.name()).collect();
    assert_eq!(names, ["IA,IA_Statewide", "Other"]);
    assert_eq!(merged.records()[0].variation_count(), 2);
}

#[test]
fn test_fetch_outside_catalog_fails_before_running_engine() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("aws_dataset.json");
    let config_path = dir.path().join("lidar.yaml");

    let catalog = RegionCatalog::from_records(vec![record(
        "Square",
        BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap(),
        "2020",
    )])
    .unwrap();
    save_catalog(&catalog, &catalog_path).unwrap();
    fs::write(
        &config_path,
        format!(
            "catalog_path: {}\npdal_program: /nonexistent/pdal\n",
            catalog_path.display()
        ),
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "lidar",
        "--config",
        config_path.to_str().unwrap(),
        "fetch",
        "--bbox",
        "100,100,200,200",
        "--epsg",
        "3857",
        "--output",
        dir.path().join("out.geojson").to_str().unwrap(),
    ])
    .unwrap();

    let err = run(cli).unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Fetch(lidar_fetch::FetchError::RegionNotFound(_))
    ));
    assert!(!dir.path().join("out.geojson").exists());
}
