//! Command line interface and command implementations.

use crate::config::RunnerConfig;
use crate::polygon::{load_polygon, polygon_from_bbox};
use crate::{Result, RunnerError};
use clap::{Args, Parser, Subcommand};
use geo::Polygon;
use lidar_catalog::{
    build_catalog, load_catalog, merge_equal_bounds, normalize_identifier, save_catalog,
    HttpMetadataSource, RegionCatalog,
};
use lidar_fetch::{
    DataFetcher, Epsg, KnownPartitions, PdalEngine, PipelineTemplate, RegionSelection,
    VariantSelector,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "lidar")]
#[command(about = "Build the USGS 3DEP LiDAR partition catalog and extract elevation points", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./lidar.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build or merge the partition catalog
    #[command(subcommand)]
    Catalog(CatalogCommand),
    /// Extract the points inside a polygon
    Fetch(FetchArgs),
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// Fetch metadata for every listed partition and write the catalog
    Build {
        /// Newline-delimited archive folder names (defaults to known_partitions_path)
        #[arg(long)]
        identifiers: Option<PathBuf>,
        /// Output catalog (defaults to catalog_path)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Keep partitions with identical bounds as separate records
        #[arg(long)]
        no_merge: bool,
    },
    /// Merge records with identical bounds in an existing catalog
    Merge {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// GeoJSON file holding the query polygon
    #[arg(long, conflicts_with = "bbox", required_unless_present = "bbox")]
    pub polygon: Option<PathBuf>,

    /// Query rectangle as minx,miny,maxx,maxy
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<String>,

    /// EPSG code of the polygon coordinates
    #[arg(long, default_value = "4326")]
    pub epsg: u16,

    /// Read from this archive folder instead of searching the catalog
    #[arg(long)]
    pub region: Option<String>,

    /// Which published variant of each partition to test (1 = first)
    #[arg(long, default_value = "1", conflicts_with = "region")]
    pub variant: usize,

    /// EPSG code of the output points (overrides target_epsg)
    #[arg(long)]
    pub target_epsg: Option<u16>,

    /// Output GeoJSON file
    #[arg(long)]
    pub output: PathBuf,
}

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let config = RunnerConfig::resolve(cli.config.as_deref())?;
    match cli.command {
        Command::Catalog(CatalogCommand::Build {
            identifiers,
            output,
            no_merge,
        }) => {
            let identifiers = identifiers.unwrap_or_else(|| config.known_partitions_path.clone());
            let output = output.unwrap_or_else(|| config.catalog_path.clone());
            catalog_build(&config, &identifiers, &output, !no_merge)
        }
        Command::Catalog(CatalogCommand::Merge { input, output }) => catalog_merge(&input, &output),
        Command::Fetch(args) => fetch(&config, &args),
    }
}

/// Ordered, de-blanked identifier list.
pub fn read_identifiers<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(normalize_identifier)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn catalog_build(config: &RunnerConfig, identifiers: &Path, output: &Path, merge: bool) -> Result<()> {
    let identifiers = read_identifiers(identifiers)?;
    let source = HttpMetadataSource::with_timeout(config.request_timeout())?;
    let report = build_catalog(&identifiers, &source, &config.consolidation_config());

    if !report.skipped.is_empty() {
        warn!("{} of {} identifiers were skipped", report.skipped.len(), identifiers.len());
    }

    let catalog = if merge {
        merge_equal_bounds(report.catalog)?
    } else {
        report.catalog
    };
    save_catalog(&catalog, output)?;
    info!("Wrote {} regions to {}", catalog.len(), output.display());
    Ok(())
}

fn catalog_merge(input: &Path, output: &Path) -> Result<()> {
    let catalog = load_catalog(input)?;
    let before = catalog.len();
    let merged = merge_equal_bounds(catalog)?;
    save_catalog(&merged, output)?;
    info!("Merged {} regions into {}", before, merged.len());
    Ok(())
}

fn query_polygon(args: &FetchArgs) -> Result<Polygon<f64>> {
    match (&args.polygon, &args.bbox) {
        (Some(path), _) => load_polygon(path),
        (None, Some(bbox)) => polygon_from_bbox(bbox),
        (None, None) => Err(RunnerError::Arguments("either --polygon or --bbox is required".to_string())),
    }
}

fn fetch(config: &RunnerConfig, args: &FetchArgs) -> Result<()> {
    let polygon = query_polygon(args)?;

    let (selection, catalog, known) = match &args.region {
        Some(name) => (
            RegionSelection::Named(name.clone()),
            RegionCatalog::new(),
            KnownPartitions::load(&config.known_partitions_path)?,
        ),
        None => (
            RegionSelection::ByBounds(VariantSelector::new(args.variant)?),
            load_catalog(&config.catalog_path)?,
            KnownPartitions::default(),
        ),
    };

    let template = match &config.template_path {
        Some(path) => PipelineTemplate::load(path)?,
        None => PipelineTemplate::default(),
    };

    let mut settings = config.fetcher_settings();
    if let Some(code) = args.target_epsg {
        settings.target_epsg = Epsg(code);
    }

    let fetcher = DataFetcher::new(
        settings,
        catalog,
        known,
        template,
        PdalEngine::new(&config.pdal_program),
    );
    let query = fetcher.prepare(&polygon, Epsg(args.epsg), &selection)?;
    let output = fetcher.fetch(&query)?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, output.dataset.to_geojson_string())?;
    info!(
        "Wrote {} points in {} to {}",
        output.dataset.len(),
        output.dataset.crs,
        args.output.display()
    );
    Ok(())
}
