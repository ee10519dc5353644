//! Query orchestration: polygon in, elevation dataset out.

use crate::elevation::{to_elevation_dataset, ElevationDataset, PointCloud};
use crate::executor::{execute, PointCloudEngine};
use crate::geometry::{project, CropBoundary, Epsg};
use crate::pipeline::{build_pipeline, ExtractionPipeline};
use crate::region::{partition_url, resolve_by_bounds, resolve_by_name, KnownPartitions, VariantSelector};
use crate::template::PipelineTemplate;
use crate::Result;
use geo::Polygon;
use lidar_catalog::{BoundingBox, RegionCatalog, DEFAULT_BASE_URL};
use tracing::{debug, info};

/// How the partition for a query is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionSelection {
    /// An explicitly named partition folder.
    Named(String),
    /// The first catalog partition whose selected variant contains the query.
    ByBounds(VariantSelector),
}

impl Default for RegionSelection {
    fn default() -> Self {
        RegionSelection::ByBounds(VariantSelector::FIRST)
    }
}

/// Settings shared by every query.
#[derive(Debug, Clone, PartialEq)]
pub struct FetcherSettings {
    /// Archive root URL.
    pub base_url: String,
    /// CRS of the returned points.
    pub target_epsg: Epsg,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            target_epsg: Epsg(26915),
        }
    }
}

/// Everything derived for a single query. Immutable once prepared.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    polygon: Polygon<f64>,
    source_crs: Epsg,
    bounding_box: BoundingBox,
    crop_boundary: CropBoundary,
    access_url: String,
    target_epsg: Epsg,
}

impl QueryContext {
    /// Query polygon as supplied.
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// CRS of the query polygon.
    pub fn source_crs(&self) -> Epsg {
        self.source_crs
    }

    /// Search bounds in the working CRS.
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// Crop shape in the source CRS.
    pub fn crop_boundary(&self) -> &CropBoundary {
        &self.crop_boundary
    }

    /// Resolved partition access URL.
    pub fn access_url(&self) -> &str {
        &self.access_url
    }

    /// CRS of the returned points.
    pub fn target_epsg(&self) -> Epsg {
        self.target_epsg
    }
}

/// Result of a fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutput {
    /// Raw projected points.
    pub cloud: PointCloud,
    /// Points tagged with elevation.
    pub dataset: ElevationDataset,
}

/// Resolves queries against a catalog and runs them on an engine.
pub struct DataFetcher<E: PointCloudEngine> {
    settings: FetcherSettings,
    catalog: RegionCatalog,
    known: KnownPartitions,
    template: PipelineTemplate,
    engine: E,
}

impl<E: PointCloudEngine> DataFetcher<E> {
    /// Create a fetcher over a loaded catalog and engine.
    pub fn new(
        settings: FetcherSettings,
        catalog: RegionCatalog,
        known: KnownPartitions,
        template: PipelineTemplate,
        engine: E,
    ) -> Self {
        Self {
            settings,
            catalog,
            known,
            template,
            engine,
        }
    }

    /// Shared query settings.
    pub fn settings(&self) -> &FetcherSettings {
        &self.settings
    }

    /// Catalog searched by bounds.
    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    /// Engine the pipelines run on.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Project the polygon and resolve the partition to read from.
    pub fn prepare(
        &self,
        polygon: &Polygon<f64>,
        source_crs: Epsg,
        selection: &RegionSelection,
    ) -> Result<QueryContext> {
        let (bounding_box, crop_boundary) = project(polygon, source_crs)?;
        debug!(
            "Query bounds in {}: {}",
            crate::geometry::WORKING_CRS,
            bounding_box.to_pdal_bounds()
        );

        let access_url = match selection {
            RegionSelection::Named(name) => {
                let name = resolve_by_name(name, &self.known)?;
                partition_url(&self.settings.base_url, &name)
            }
            RegionSelection::ByBounds(variant) => {
                resolve_by_bounds(&bounding_box, &self.catalog, *variant)?
            }
        };

        Ok(QueryContext {
            polygon: polygon.clone(),
            source_crs,
            bounding_box,
            crop_boundary,
            access_url,
            target_epsg: self.settings.target_epsg,
        })
    }

    /// Concrete pipeline for a prepared query.
    pub fn pipeline(&self, context: &QueryContext) -> ExtractionPipeline {
        build_pipeline(
            &self.template,
            &context.bounding_box,
            &context.crop_boundary,
            &context.access_url,
            context.target_epsg,
        )
    }

    /// Run a prepared query.
    pub fn fetch(&self, context: &QueryContext) -> Result<FetchOutput> {
        info!("Fetching points from {}", context.access_url);
        let pipeline = self.pipeline(context);
        let cloud = execute(&self.engine, &pipeline)?;
        let dataset = to_elevation_dataset(&cloud, context.target_epsg);
        Ok(FetchOutput { cloud, dataset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RawPoints;
    use crate::FetchError;
    use geo::polygon;
    use lidar_catalog::PartitionRecord;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingEngine {
        seen: RefCell<Vec<ExtractionPipeline>>,
    }

    impl PointCloudEngine for RecordingEngine {
        fn run(&self, pipeline: &ExtractionPipeline) -> Result<RawPoints> {
            self.seen.borrow_mut().push(pipeline.clone());
            Ok(RawPoints {
                count: 1,
                records: vec![vec![1.0, 2.0, 3.0]],
            })
        }
    }

    fn fetcher() -> DataFetcher<RecordingEngine> {
        let record = PartitionRecord::from_parts(
            "Square",
            vec![BoundingBox::new(0.0, 0.0, 1000.0, 1000.0).unwrap()],
            vec!["2020".to_string()],
            vec!["https://archive.test/Square_2020/ept.json".to_string()],
            vec![10],
        )
        .unwrap();
        DataFetcher::new(
            FetcherSettings {
                base_url: "https://archive.test/".to_string(),
                target_epsg: Epsg(26915),
            },
            RegionCatalog::from_records(vec![record]).unwrap(),
            KnownPartitions::parse("Square_2020/\n"),
            PipelineTemplate::default(),
            RecordingEngine::default(),
        )
    }

    fn inner_square() -> Polygon<f64> {
        polygon![(x: 10.0, y: 10.0), (x: 20.0, y: 10.0), (x: 20.0, y: 20.0), (x: 10.0, y: 20.0)]
    }

    #[test]
    fn test_prepare_by_bounds() {
        let f = fetcher();
        let ctx = f
            .prepare(&inner_square(), Epsg(3857), &RegionSelection::default())
            .unwrap();
        assert_eq!(ctx.access_url(), "https://archive.test/Square_2020/ept.json");
        assert_eq!(ctx.bounding_box(), &BoundingBox::new(10.0, 10.0, 20.0, 20.0).unwrap());
        assert_eq!(ctx.target_epsg(), Epsg(26915));
        assert_eq!(ctx.source_crs(), Epsg(3857));
    }

    #[test]
    fn test_prepare_by_name() {
        let f = fetcher();
        let ctx = f
            .prepare(
                &inner_square(),
                Epsg(3857),
                &RegionSelection::Named("Square_2020".to_string()),
            )
            .unwrap();
        assert_eq!(ctx.access_url(), "https://archive.test/Square_2020/ept.json");

        let unknown = f.prepare(&inner_square(), Epsg(3857), &RegionSelection::Named("Nope".to_string()));
        assert!(matches!(unknown, Err(FetchError::RegionNotFound(_))));
    }

    #[test]
    fn test_fetch_runs_pipeline_for_context() {
        let f = fetcher();
        let ctx = f
            .prepare(&inner_square(), Epsg(3857), &RegionSelection::default())
            .unwrap();
        let output = f.fetch(&ctx).unwrap();

        assert_eq!(output.cloud.points(), [[1.0, 2.0, 3.0]]);
        assert_eq!(output.dataset.records[0].elevation, 3.0);
        assert_eq!(output.dataset.crs, Epsg(26915));

        let seen = f.engine.seen.borrow();
        assert_eq!(seen.len(), 1);
        let reader = seen[0].reader().unwrap();
        assert_eq!(reader.filename, ctx.access_url());
        assert_eq!(reader.bounds, "([10, 20],[10, 20])");
    }

    #[test]
    fn test_query_outside_catalog_is_not_found() {
        let f = fetcher();
        let far = polygon![(x: 5000.0, y: 5000.0), (x: 6000.0, y: 5000.0), (x: 6000.0, y: 6000.0)];
        assert!(matches!(
            f.prepare(&far, Epsg(3857), &RegionSelection::default()),
            Err(FetchError::RegionNotFound(_))
        ));
    }
}
