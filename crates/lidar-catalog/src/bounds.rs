//! Axis-aligned bounding boxes in the archive's projected CRS.

use crate::{CatalogError, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle `(minx, miny, maxx, maxy)`.
///
/// All boxes handled by the catalog and the resolver live in the archive's
/// native CRS (EPSG:3857, meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", try_from = "[f64; 4]")]
pub struct BoundingBox {
    /// Minimum X (west edge).
    pub minx: f64,
    /// Minimum Y (south edge).
    pub miny: f64,
    /// Maximum X (east edge).
    pub maxx: f64,
    /// Maximum Y (north edge).
    pub maxy: f64,
}

impl BoundingBox {
    /// Create a bounding box, rejecting non-finite or inverted edges.
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Result<Self> {
        let values = [minx, miny, maxx, maxy];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CatalogError::InvalidBounds {
                values: values.to_vec(),
                reason: "non-finite coordinate".to_string(),
            });
        }
        if minx > maxx || miny > maxy {
            return Err(CatalogError::InvalidBounds {
                values: values.to_vec(),
                reason: "min exceeds max".to_string(),
            });
        }
        Ok(Self {
            minx,
            miny,
            maxx,
            maxy,
        })
    }

    /// Build a box from the `bounds` array of an `ept.json` document.
    ///
    /// EPT stores a cube `[xmin, ymin, zmin, xmax, ymax, zmax]`; the vertical
    /// extent is dropped. A plain `[minx, miny, maxx, maxy]` is accepted too.
    pub fn from_ept_bounds(values: &[f64]) -> Result<Self> {
        match values {
            [minx, miny, _, maxx, maxy, _] => Self::new(*minx, *miny, *maxx, *maxy),
            [minx, miny, maxx, maxy] => Self::new(*minx, *miny, *maxx, *maxy),
            _ => Err(CatalogError::InvalidBounds {
                values: values.to_vec(),
                reason: format!("expected 4 or 6 values, got {}", values.len()),
            }),
        }
    }

    /// True if `other` lies entirely within this box (edges inclusive).
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.minx >= self.minx
            && other.maxx <= self.maxx
            && other.miny >= self.miny
            && other.maxy <= self.maxy
    }

    /// Width along X.
    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    /// Height along Y.
    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    /// Bounds in the `([minx, maxx],[miny, maxy])` form used by EPT readers.
    pub fn to_pdal_bounds(&self) -> String {
        format!(
            "([{}, {}],[{}, {}])",
            self.minx, self.maxx, self.miny, self.maxy
        )
    }

    /// Bit patterns of the four edges, used as an exact-equality key.
    pub(crate) fn bit_key(&self) -> [u64; 4] {
        [
            self.minx.to_bits(),
            self.miny.to_bits(),
            self.maxx.to_bits(),
            self.maxy.to_bits(),
        ]
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.minx, b.miny, b.maxx, b.maxy]
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = CatalogError;

    fn try_from(v: [f64; 4]) -> Result<Self> {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}
