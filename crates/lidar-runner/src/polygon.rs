//! Query polygon input: a GeoJSON file or a `minx,miny,maxx,maxy` box.

use crate::{Result, RunnerError};
use geo::{Coord, LineString, Polygon};
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;

/// Parse `minx,miny,maxx,maxy` into a rectangular polygon.
pub fn polygon_from_bbox(text: &str) -> Result<Polygon<f64>> {
    let values = text
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| RunnerError::Polygon(format!("'{}' is not a number", v.trim())))
        })
        .collect::<Result<Vec<f64>>>()?;

    let &[minx, miny, maxx, maxy] = values.as_slice() else {
        return Err(RunnerError::Polygon(format!(
            "bounding box needs 4 values, got {}",
            values.len()
        )));
    };
    if minx >= maxx || miny >= maxy {
        return Err(RunnerError::Polygon(format!(
            "bounding box ({}, {}, {}, {}) is empty",
            minx, miny, maxx, maxy
        )));
    }

    Ok(Polygon::new(
        LineString::from(vec![
            (minx, miny),
            (minx, maxy),
            (maxx, maxy),
            (maxx, miny),
            (minx, miny),
        ]),
        vec![],
    ))
}

/// Parse the first polygon found in a GeoJSON document.
///
/// Features, feature collections and bare geometries are accepted; for a
/// multipolygon the first member is used. Holes are kept but only the
/// exterior ring takes part in the query.
pub fn polygon_from_geojson(text: &str) -> Result<Polygon<f64>> {
    let document: GeoJson = text
        .parse()
        .map_err(|e| RunnerError::Polygon(format!("invalid GeoJSON: {}", e)))?;

    let geometries: Vec<Geometry> = match document {
        GeoJson::FeatureCollection(fc) => fc.features.into_iter().filter_map(|f| f.geometry).collect(),
        GeoJson::Feature(f) => f.geometry.into_iter().collect(),
        GeoJson::Geometry(g) => vec![g],
    };

    let rings = geometries
        .into_iter()
        .find_map(|g| match g.value {
            Value::Polygon(rings) => Some(rings),
            Value::MultiPolygon(polygons) => polygons.into_iter().next(),
            _ => None,
        })
        .ok_or_else(|| RunnerError::Polygon("document holds no polygon".to_string()))?;

    let mut rings = rings.into_iter().map(line_string);
    let exterior = rings
        .next()
        .ok_or_else(|| RunnerError::Polygon("polygon has no exterior ring".to_string()))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Read a polygon from a GeoJSON file.
pub fn load_polygon<P: AsRef<Path>>(path: P) -> Result<Polygon<f64>> {
    polygon_from_geojson(&fs::read_to_string(path)?)
}

fn line_string(positions: Vec<Vec<f64>>) -> Result<LineString<f64>> {
    positions
        .into_iter()
        .map(|p| match *p.as_slice() {
            [x, y, ..] => Ok(Coord { x, y }),
            _ => Err(RunnerError::Polygon("position needs two coordinates".to_string())),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::BoundingRect;

    #[test]
    fn test_bbox_polygon() {
        let p = polygon_from_bbox("-93.756155, 41.918015, -93.747334, 41.921429").unwrap();
        let rect = p.bounding_rect().unwrap();
        assert_eq!(rect.min().x, -93.756155);
        assert_eq!(rect.max().y, 41.921429);
        assert_eq!(p.exterior().0.len(), 5);
    }

    #[test]
    fn test_bad_bbox() {
        assert!(polygon_from_bbox("1,2,3").is_err());
        assert!(polygon_from_bbox("1,2,x,4").is_err());
        assert!(polygon_from_bbox("3,2,1,4").is_err());
    }

    #[test]
    fn test_feature_collection_polygon() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [0, 0] } },
                { "type": "Feature", "properties": {}, "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-93.75, 41.91], [-93.74, 41.91], [-93.74, 41.92], [-93.75, 41.91]]]
                } }
            ]
        }"#;
        let p = polygon_from_geojson(text).unwrap();
        assert_eq!(p.exterior().0[1], Coord { x: -93.74, y: 41.91 });
        assert!(p.interiors().is_empty());
    }

    #[test]
    fn test_multipolygon_uses_first_member() {
        let text = r#"{ "type": "MultiPolygon", "coordinates": [
            [[[0, 0], [1, 0], [1, 1], [0, 0]]],
            [[[5, 5], [6, 5], [6, 6], [5, 5]]]
        ] }"#;
        let p = polygon_from_geojson(text).unwrap();
        assert_eq!(p.exterior().0[0], Coord { x: 0.0, y: 0.0 });
    }

    #[test]
    fn test_document_without_polygon() {
        let text = r#"{ "type": "Point", "coordinates": [0, 0] }"#;
        assert!(matches!(polygon_from_geojson(text), Err(RunnerError::Polygon(_))));
        assert!(polygon_from_geojson("{").is_err());
    }
}
