//! Extraction pipeline construction.
//!
//! A pipeline is always five stages in a fixed order:
//! reader, crop, range filter, assignment filter, reprojection. Crop and range
//! act on raw archive attributes; reprojection runs last so the crop boundary
//! is applied in the CRS it was declared in.

use crate::geometry::{CropBoundary, Epsg};
use crate::template::{PipelineTemplate, StageOptions, StageTemplate};
use lidar_catalog::BoundingBox;
use serde_json::{json, Value};

/// Kind of pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Reads points from the remote archive.
    Reader,
    /// Drops points outside the query polygon.
    Crop,
    /// Drops points by attribute range.
    Range,
    /// Overwrites attribute values.
    Assign,
    /// Reprojects the output.
    Reprojection,
}

impl StageKind {
    /// All kinds in pipeline order.
    pub const ORDER: [StageKind; 5] = [
        StageKind::Reader,
        StageKind::Crop,
        StageKind::Range,
        StageKind::Assign,
        StageKind::Reprojection,
    ];

    /// Key of this stage's skeleton in a template document.
    pub fn template_key(&self) -> &'static str {
        match self {
            StageKind::Reader => "reader",
            StageKind::Crop => "cropping_filter",
            StageKind::Range => "range_filter",
            StageKind::Assign => "assign_filter",
            StageKind::Reprojection => "reprojection_filter",
        }
    }

    /// Driver used when a skeleton does not name one.
    pub fn default_driver(&self) -> &'static str {
        match self {
            StageKind::Reader => "readers.ept",
            StageKind::Crop => "filters.crop",
            StageKind::Range => "filters.range",
            StageKind::Assign => "filters.assign",
            StageKind::Reprojection => "filters.reprojection",
        }
    }

    /// Whether `driver` can fill this stage. Any reader may be used; filters
    /// must be the exact driver.
    pub fn accepts_driver(&self, driver: &str) -> bool {
        match self {
            StageKind::Reader => driver.starts_with("readers."),
            _ => driver == self.default_driver(),
        }
    }
}

/// Remote point reader.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderStage {
    /// Reader driver.
    pub driver: String,
    /// Partition access URL.
    pub filename: String,
    /// Query bounds as `([minx, maxx],[miny, maxy])`.
    pub bounds: String,
    /// Template defaults.
    pub options: StageOptions,
}

/// Polygon crop.
#[derive(Debug, Clone, PartialEq)]
pub struct CropStage {
    /// WKT polygon.
    pub polygon: String,
    /// CRS of the polygon coordinates.
    pub a_srs: String,
    /// Template defaults.
    pub options: StageOptions,
}

/// Attribute range filter, passed through from the template.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeStage {
    /// Template parameters.
    pub options: StageOptions,
}

/// Attribute assignment filter, passed through from the template.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStage {
    /// Template parameters.
    pub options: StageOptions,
}

/// Output reprojection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReprojectionStage {
    /// Target CRS, e.g. `EPSG:26915`.
    pub out_srs: String,
    /// Template defaults.
    pub options: StageOptions,
}

/// One typed pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// See [`ReaderStage`].
    Reader(ReaderStage),
    /// See [`CropStage`].
    Crop(CropStage),
    /// See [`RangeStage`].
    Range(RangeStage),
    /// See [`AssignStage`].
    Assign(AssignStage),
    /// See [`ReprojectionStage`].
    Reprojection(ReprojectionStage),
}

impl Stage {
    /// Kind of this stage.
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Reader(_) => StageKind::Reader,
            Stage::Crop(_) => StageKind::Crop,
            Stage::Range(_) => StageKind::Range,
            Stage::Assign(_) => StageKind::Assign,
            Stage::Reprojection(_) => StageKind::Reprojection,
        }
    }

    /// Engine JSON for this stage. Query parameters override template keys.
    pub fn to_json(&self) -> Value {
        let (driver, options, overrides): (&str, &StageOptions, Vec<(&str, &str)>) = match self {
            Stage::Reader(s) => (
                s.driver.as_str(),
                &s.options,
                vec![("filename", s.filename.as_str()), ("bounds", s.bounds.as_str())],
            ),
            Stage::Crop(s) => (
                StageKind::Crop.default_driver(),
                &s.options,
                vec![("polygon", s.polygon.as_str()), ("a_srs", s.a_srs.as_str())],
            ),
            Stage::Range(s) => (StageKind::Range.default_driver(), &s.options, vec![]),
            Stage::Assign(s) => (StageKind::Assign.default_driver(), &s.options, vec![]),
            Stage::Reprojection(s) => (
                StageKind::Reprojection.default_driver(),
                &s.options,
                vec![("out_srs", s.out_srs.as_str())],
            ),
        };

        let mut object = options.clone();
        object.insert("type".to_string(), Value::String(driver.to_string()));
        for (key, value) in overrides {
            object.insert(key.to_string(), Value::String(value.to_string()));
        }
        Value::Object(object)
    }
}

/// Ordered, immutable extraction pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionPipeline {
    stages: Vec<Stage>,
}

impl ExtractionPipeline {
    /// Stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The reader stage.
    pub fn reader(&self) -> Option<&ReaderStage> {
        self.stages.iter().find_map(|s| match s {
            Stage::Reader(r) => Some(r),
            _ => None,
        })
    }

    /// Engine pipeline document: `{"pipeline": [stage, ...]}`.
    pub fn to_pdal_json(&self) -> Value {
        self.to_pdal_json_with(None)
    }

    /// Engine document with an extra trailing stage (typically a writer).
    pub fn to_pdal_json_with(&self, trailing: Option<Value>) -> Value {
        let mut stages: Vec<Value> = self.stages.iter().map(Stage::to_json).collect();
        stages.extend(trailing);
        json!({ "pipeline": stages })
    }
}

/// Build a concrete pipeline from a template and query parameters.
pub fn build_pipeline(
    template: &PipelineTemplate,
    bounding_box: &BoundingBox,
    crop_boundary: &CropBoundary,
    partition_access_url: &str,
    target_epsg: Epsg,
) -> ExtractionPipeline {
    let PipelineTemplate {
        reader,
        crop,
        range,
        assign,
        reprojection,
    } = template;

    let stages = vec![
        Stage::Reader(ReaderStage {
            driver: reader.driver.clone(),
            filename: partition_access_url.to_string(),
            bounds: bounding_box.to_pdal_bounds(),
            options: without(reader, &["filename", "bounds"]),
        }),
        Stage::Crop(CropStage {
            polygon: crop_boundary.wkt().to_string(),
            a_srs: crop_boundary.crs().to_string(),
            options: without(crop, &["polygon", "a_srs"]),
        }),
        Stage::Range(RangeStage {
            options: range.options.clone(),
        }),
        Stage::Assign(AssignStage {
            options: assign.options.clone(),
        }),
        Stage::Reprojection(ReprojectionStage {
            out_srs: target_epsg.to_string(),
            options: without(reprojection, &["out_srs"]),
        }),
    ];

    ExtractionPipeline { stages }
}

fn without(stage: &StageTemplate, keys: &[&str]) -> StageOptions {
    let mut options = stage.options.clone();
    for key in keys {
        options.remove(*key);
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WORKING_CRS;
    use geo::polygon;

    fn inputs() -> (BoundingBox, CropBoundary) {
        let bbox = BoundingBox::new(-10_436_887.5, 5_148_706.25, -10_435_905.5, 5_149_217.0).unwrap();
        let shape = polygon![
            (x: -10_436_887.5, y: 5_148_706.25),
            (x: -10_435_905.5, y: 5_148_706.25),
            (x: -10_435_905.5, y: 5_149_217.0),
        ];
        (bbox, CropBoundary::from_polygon(&shape, WORKING_CRS))
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let (bbox, crop) = inputs();
        let pipeline = build_pipeline(&PipelineTemplate::default(), &bbox, &crop, "u", Epsg(26915));
        let kinds: Vec<StageKind> = pipeline.stages().iter().map(Stage::kind).collect();
        assert_eq!(kinds, StageKind::ORDER);
    }

    #[test]
    fn test_query_parameters_fill_stages() {
        let (bbox, crop) = inputs();
        let url = "https://usgs-lidar-public.s3.us-west-2.amazonaws.com/IA_FullState/ept.json";
        let pipeline = build_pipeline(&PipelineTemplate::default(), &bbox, &crop, url, Epsg(26915));
        let doc = pipeline.to_pdal_json();
        let stages = doc["pipeline"].as_array().unwrap();

        assert_eq!(stages[0]["type"], "readers.ept");
        assert_eq!(stages[0]["filename"], url);
        assert_eq!(
            stages[0]["bounds"],
            "([-10436887.5, -10435905.5],[5148706.25, 5149217])"
        );
        assert_eq!(stages[1]["type"], "filters.crop");
        assert_eq!(stages[1]["polygon"], crop.wkt());
        assert_eq!(stages[1]["a_srs"], "EPSG:3857");
        assert_eq!(stages[2]["limits"], "Classification![7:7]");
        assert_eq!(stages[3]["assignment"], "Classification[:]=0");
        assert_eq!(stages[4]["type"], "filters.reprojection");
        assert_eq!(stages[4]["out_srs"], "EPSG:26915");
    }

    #[test]
    fn test_template_placeholders_are_replaced() {
        let template = PipelineTemplate::from_json_str(
            r#"{
                "reprojection_filter": { "out_srs": "EPSG:4326", "tag": "reprojectUTM" },
                "reader": { "type": "readers.ept", "filename": "", "bounds": "", "tag": "readdata" },
                "assign_filter": { "assignment": "Classification[:]=0" },
                "cropping_filter": { "polygon": "" },
                "range_filter": { "limits": "Classification![7:7]" }
            }"#,
        )
        .unwrap();
        let (bbox, crop) = inputs();
        let pipeline = build_pipeline(&template, &bbox, &crop, "u", Epsg(32615));

        let reader = pipeline.reader().unwrap();
        assert_eq!(reader.filename, "u");
        assert!(!reader.options.contains_key("filename"));
        assert_eq!(reader.options["tag"], "readdata");

        let doc = pipeline.to_pdal_json();
        assert_eq!(doc["pipeline"][0]["type"], "readers.ept");
        assert_eq!(doc["pipeline"][4]["out_srs"], "EPSG:32615");
        assert_eq!(doc["pipeline"][4]["tag"], "reprojectUTM");
    }

    #[test]
    fn test_trailing_stage_is_appended_last() {
        let (bbox, crop) = inputs();
        let pipeline = build_pipeline(&PipelineTemplate::default(), &bbox, &crop, "u", Epsg(26915));
        let doc = pipeline.to_pdal_json_with(Some(json!({ "type": "writers.text" })));
        let stages = doc["pipeline"].as_array().unwrap();
        assert_eq!(stages.len(), 6);
        assert_eq!(stages[5]["type"], "writers.text");
    }
}
