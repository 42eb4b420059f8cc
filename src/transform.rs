//! Pixel <-> geographic coordinate transforms.
//!
//! Real-valued `(row, col)` pixel coordinates name pixel centers: `(0.0,
//! 0.0)` is the center of the upper-left pixel and its upper-left corner
//! is `(-0.5, -0.5)`. [`PixelTransform::lonlat_to_pixel`] rounds half up,
//! so it returns the pixel whose area contains the point.

use crate::affine::Affine;
use crate::crs::{normalize_lon, UtmZone};
use crate::error::TileError;
use crate::proj::transverse_mercator::TransverseMercator;
use crate::proj::Projection;

/// The affine grid of one raster extent composed with its UTM projection.
#[derive(Clone, Debug)]
pub struct PixelTransform {
    zone: UtmZone,
    projection: TransverseMercator,
    affine: Affine,
    inverse: Affine,
}

impl PixelTransform {
    pub fn new(zone: UtmZone, affine: Affine) -> Result<Self, TileError> {
        Ok(Self {
            zone,
            projection: TransverseMercator::utm(&zone),
            inverse: affine.inverse()?,
            affine,
        })
    }

    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    pub fn affine(&self) -> Affine {
        self.affine
    }

    /// Projected coordinates of a pixel center.
    pub fn rowcol_to_xy(&self, row: f64, col: f64) -> (f64, f64) {
        self.affine.forward(col + 0.5, row + 0.5)
    }

    pub fn xy_to_rowcol(&self, x: f64, y: f64) -> (f64, f64) {
        let (col, row) = self.inverse.forward(x, y);
        (row - 0.5, col - 0.5)
    }

    /// `(row, col) -> (lon, lat)`; the longitude is wrapped to [-180, 180).
    ///
    /// Rows and columns outside the raster are fine; this only fails when
    /// the point has no geographic preimage.
    pub fn rowcol_to_lonlat(&self, row: f64, col: f64) -> Result<(f64, f64), TileError> {
        let (x, y) = self.rowcol_to_xy(row, col);
        let (lon, lat) = self.projection.inverse_deg(x, y)?;
        Ok((normalize_lon(lon), lat))
    }

    /// `(lon, lat) -> (row, col)` as sub-pixel coordinates.
    pub fn lonlat_to_rowcol(&self, lon: f64, lat: f64) -> Result<(f64, f64), TileError> {
        let (x, y) = self.projection.forward_deg(lon, lat)?;
        Ok(self.xy_to_rowcol(x, y))
    }

    /// Integer `(row, col)` of the pixel containing `(lon, lat)`.
    pub fn lonlat_to_pixel(&self, lon: f64, lat: f64) -> Result<(i64, i64), TileError> {
        let (row, col) = self.lonlat_to_rowcol(lon, lat)?;
        Ok((round_half_up(row), round_half_up(col)))
    }

    pub fn rowcols_to_lonlats(
        &self,
        rows: &[f64],
        cols: &[f64],
    ) -> Result<Vec<(f64, f64)>, TileError> {
        if rows.len() != cols.len() {
            return Err(TileError::InvalidParameter(format!(
                "rows and cols must have the same length, got {} and {}",
                rows.len(),
                cols.len()
            )));
        }
        rows.iter()
            .zip(cols)
            .map(|(&row, &col)| self.rowcol_to_lonlat(row, col))
            .collect()
    }

    pub fn lonlats_to_rowcols(
        &self,
        lons: &[f64],
        lats: &[f64],
    ) -> Result<Vec<(f64, f64)>, TileError> {
        if lons.len() != lats.len() {
            return Err(TileError::InvalidParameter(format!(
                "lons and lats must have the same length, got {} and {}",
                lons.len(),
                lats.len()
            )));
        }
        lons.iter()
            .zip(lats)
            .map(|(&lon, &lat)| self.lonlat_to_rowcol(lon, lat))
            .collect()
    }
}

fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}
