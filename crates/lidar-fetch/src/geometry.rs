//! Query polygon projection.
//!
//! A query arrives as a polygon in any EPSG coordinate system. The archive is
//! indexed in Web Mercator, so the polygon is reprojected to EPSG:3857 to get
//! the search bounding box, while the crop boundary keeps the polygon's own
//! coordinates and carries its CRS along for the crop stage.

use crate::GeometryError;
use geo::{BoundingRect, Coord, LineString, Polygon};
use lidar_catalog::BoundingBox;
use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Working CRS of the archive's bounds (Web Mercator, meters).
pub const WORKING_CRS: Epsg = Epsg(3857);

/// EPSG code of a coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epsg(pub u16);

impl Epsg {
    /// WGS 84 longitude/latitude.
    pub const WGS84: Epsg = Epsg(4326);

    /// Numeric code.
    pub fn code(&self) -> u16 {
        self.0
    }

    /// PROJ.4 definition from the bundled CRS database.
    pub fn proj_string(&self) -> Option<&'static str> {
        crs_definitions::from_code(self.0).map(|def| def.proj4)
    }

    /// True for longitude/latitude systems (coordinates in degrees).
    pub fn is_geographic(&self) -> bool {
        self.proj_string()
            .map(|s| s.contains("+proj=longlat"))
            .unwrap_or(false)
    }
}

impl fmt::Display for Epsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// Exact query shape as WKT, in the CRS the polygon was supplied in.
#[derive(Debug, Clone, PartialEq)]
pub struct CropBoundary {
    wkt: String,
    crs: Epsg,
}

impl CropBoundary {
    /// Serialize the exterior ring of `polygon` as a closed WKT polygon.
    pub fn from_polygon(polygon: &Polygon<f64>, crs: Epsg) -> Self {
        let mut ring: Vec<Coord<f64>> = polygon.exterior().coords().copied().collect();
        if ring.first() != ring.last() {
            if let Some(first) = ring.first().copied() {
                ring.push(first);
            }
        }
        let vertices: Vec<String> = ring.iter().map(|c| format!("{} {}", c.x, c.y)).collect();
        Self {
            wkt: format!("POLYGON (({}))", vertices.join(", ")),
            crs,
        }
    }

    /// WKT text.
    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    /// CRS of the WKT coordinates.
    pub fn crs(&self) -> Epsg {
        self.crs
    }
}

/// Reusable transform between two EPSG systems.
pub struct Projector {
    from: Epsg,
    to: Epsg,
    source: Proj,
    target: Proj,
    source_geographic: bool,
    target_geographic: bool,
}

impl fmt::Debug for Projector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projector")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl Projector {
    /// Build a transform from `from` to `to`.
    pub fn new(from: Epsg, to: Epsg) -> Result<Self, GeometryError> {
        Ok(Self {
            from,
            to,
            source: load_proj(from)?,
            target: load_proj(to)?,
            source_geographic: from.is_geographic(),
            target_geographic: to.is_geographic(),
        })
    }

    /// Transform one coordinate pair.
    pub fn project(&self, x: f64, y: f64) -> Result<(f64, f64), GeometryError> {
        if self.from == self.to {
            return Ok((x, y));
        }

        // proj4rs works in radians for geographic systems
        let mut point = if self.source_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        proj4rs::transform::transform(&self.source, &self.target, &mut point).map_err(|e| {
            GeometryError::Projection {
                from: self.from.0,
                to: self.to.0,
                reason: format!("{:?}", e),
            }
        })?;

        let (out_x, out_y) = if self.target_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out_x.is_finite() || !out_y.is_finite() {
            return Err(GeometryError::Projection {
                from: self.from.0,
                to: self.to.0,
                reason: format!("({}, {}) has no finite image", x, y),
            });
        }
        Ok((out_x, out_y))
    }
}

fn load_proj(epsg: Epsg) -> Result<Proj, GeometryError> {
    let definition = epsg.proj_string().ok_or(GeometryError::UnknownCrs(epsg.0))?;
    Proj::from_proj_string(definition).map_err(|e| GeometryError::Projection {
        from: epsg.0,
        to: epsg.0,
        reason: format!("invalid definition: {:?}", e),
    })
}

/// Project a single point between two EPSG systems.
pub fn project_point(from: Epsg, to: Epsg, x: f64, y: f64) -> Result<(f64, f64), GeometryError> {
    Projector::new(from, to)?.project(x, y)
}

/// Reproject `polygon` into the working CRS and derive the search bounding box
/// and the crop boundary.
///
/// The bounding box is taken over the reprojected exterior ring; the crop
/// boundary keeps the input coordinates.
pub fn project(
    polygon: &Polygon<f64>,
    source_crs: Epsg,
) -> Result<(BoundingBox, CropBoundary), GeometryError> {
    validate_ring(polygon.exterior())?;

    let projector = Projector::new(source_crs, WORKING_CRS)?;
    let projected: LineString<f64> = polygon
        .exterior()
        .coords()
        .map(|c| projector.project(c.x, c.y).map(|(x, y)| Coord { x, y }))
        .collect::<Result<Vec<_>, _>>()?
        .into();

    let rect = projected
        .bounding_rect()
        .ok_or_else(|| GeometryError::InvalidBounds("empty ring".to_string()))?;
    let bbox = BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
        .map_err(|e| GeometryError::InvalidBounds(e.to_string()))?;

    Ok((bbox, CropBoundary::from_polygon(polygon, source_crs)))
}

fn validate_ring(ring: &LineString<f64>) -> Result<(), GeometryError> {
    let mut distinct = HashSet::new();
    for c in ring.coords() {
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(GeometryError::NonFiniteCoordinate { x: c.x, y: c.y });
        }
        distinct.insert((c.x.to_bits(), c.y.to_bits()));
    }
    if distinct.len() < 3 {
        return Err(GeometryError::TooFewVertices(distinct.len()));
    }
    Ok(())
}
