//! Point clouds and elevation datasets.

use crate::geometry::Epsg;
use crate::{FetchError, Result};
use geo::Point;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use serde_json::json;

/// Projected points as `[x, y, z]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    points: Vec<[f64; 3]>,
}

impl PointCloud {
    /// Wrap already extracted points.
    pub fn new(points: Vec<[f64; 3]>) -> Self {
        Self { points }
    }

    /// Keep the last three fields of every record.
    pub fn from_records(records: &[Vec<f64>]) -> Result<Self> {
        let points = records
            .iter()
            .enumerate()
            .map(|(i, record)| match record.as_slice() {
                [.., x, y, z] => Ok([*x, *y, *z]),
                _ => Err(FetchError::PipelineExecution(format!(
                    "record {} has {} fields, expected at least 3",
                    i,
                    record.len()
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { points })
    }

    /// Points as `[x, y, z]`.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the cloud holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A point geometry tagged with its elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationRecord {
    /// Height of the point (its z value).
    pub elevation: f64,
    /// Planar position in the dataset CRS.
    pub geometry: Point<f64>,
}

/// Elevation-tagged points in a single CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationDataset {
    /// CRS of every record geometry.
    pub crs: Epsg,
    /// One record per point, in cloud order.
    pub records: Vec<ElevationRecord>,
}

impl ElevationDataset {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there is nothing to export.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Export as a GeoJSON feature collection.
    ///
    /// Each record becomes a Point feature with an `elevation` property. The
    /// collection carries a named `crs` member since coordinates are generally
    /// not WGS 84.
    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .records
            .iter()
            .map(|record| {
                let mut properties = JsonObject::new();
                properties.insert("elevation".to_string(), json!(record.elevation));
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(geojson::Value::Point(vec![
                        record.geometry.x(),
                        record.geometry.y(),
                    ]))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let mut foreign = JsonObject::new();
        foreign.insert(
            "crs".to_string(),
            json!({
                "type": "name",
                "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", self.crs.code()) }
            }),
        );

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign),
        }
    }

    /// GeoJSON text of [`Self::to_geojson`].
    pub fn to_geojson_string(&self) -> String {
        GeoJson::from(self.to_geojson()).to_string()
    }
}

/// Tag every point with its z value as elevation and an (x, y) geometry.
pub fn to_elevation_dataset(cloud: &PointCloud, crs: Epsg) -> ElevationDataset {
    let records = cloud
        .points()
        .iter()
        .map(|&[x, y, z]| ElevationRecord {
            elevation: z,
            geometry: Point::new(x, y),
        })
        .collect();
    ElevationDataset { crs, records }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn cloud() -> PointCloud {
        PointCloud::new(vec![
            [448_262.12, 4_641_120.5, 310.25],
            [448_263.0, 4_641_121.0, 311.0],
            [448_264.5, 4_641_119.75, 309.875],
        ])
    }

    #[test]
    fn test_dataset_preserves_length_and_elevation() {
        let cloud = cloud();
        let dataset = to_elevation_dataset(&cloud, Epsg(26915));
        assert_eq!(dataset.len(), cloud.len());
        assert_eq!(dataset.crs, Epsg(26915));
        for (record, point) in dataset.records.iter().zip(cloud.points()) {
            assert_eq!(record.elevation, point[2]);
            assert_eq!(record.geometry, Point::new(point[0], point[1]));
        }
    }

    #[test]
    fn test_empty_cloud_gives_empty_dataset() {
        let dataset = to_elevation_dataset(&PointCloud::default(), Epsg(26915));
        assert!(dataset.is_empty());
        assert!(dataset.to_geojson().features.is_empty());
    }

    #[test]
    fn test_from_records_takes_trailing_fields() {
        let cloud = PointCloud::from_records(&[vec![7.0, 1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(cloud.points(), [[1.0, 2.0, 3.0]]);
        assert!(PointCloud::from_records(&[vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_geojson_export() {
        let dataset = to_elevation_dataset(&cloud(), Epsg(26915));
        let value: Value = serde_json::from_str(&dataset.to_geojson_string()).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::26915");
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert_eq!(features[0]["geometry"]["coordinates"][0], 448_262.12);
        assert_eq!(features[2]["properties"]["elevation"], 309.875);
    }
}
