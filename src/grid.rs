//! The tiling grid: resolution, tile size and padding.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use geo::{Area, Centroid};
use serde::{Deserialize, Serialize};

use crate::context::validate_resolution;
use crate::cover::TileCover;
use crate::crs::{resolve_crs, UtmZone};
use crate::error::TileError;
use crate::geometry::Geometry;
use crate::proj::transverse_mercator::TransverseMercator;
use crate::proj::Projection;
use crate::tile::Tile;

/// Square metres in a square degree at the equator (111 km squared).
const M2_PER_DEG2: f64 = 12_321_000_000.0;

/// A regular division of every UTM zone into square tiles.
///
/// Each zone's grid is anchored at the zone's natural origin, so cell
/// `(col, row)` spans easting `[500000 + col*w, 500000 + (col+1)*w)` and
/// northing `[FN + row*w, FN + (row+1)*w)` with `w = tile_size * resolution`.
/// `pad` pixels of overlap are added on every side of a tile's raster.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridParams", into = "GridParams")]
pub struct Grid {
    resolution: f64,
    tile_size: u32,
    pad: u32,
}

#[derive(Serialize, Deserialize)]
struct GridParams {
    resolution: f64,
    tile_size: i64,
    #[serde(default)]
    pad: i64,
}

impl TryFrom<GridParams> for Grid {
    type Error = TileError;

    fn try_from(p: GridParams) -> Result<Self, Self::Error> {
        let tile_size = u32::try_from(p.tile_size).map_err(|_| {
            TileError::InvalidParameter(format!(
                "tile size must be a positive integer, got {}",
                p.tile_size
            ))
        })?;
        let pad = u32::try_from(p.pad).map_err(|_| {
            TileError::InvalidParameter(format!("pad must be non-negative, got {}", p.pad))
        })?;
        Grid::new(p.resolution, tile_size, pad)
    }
}

impl From<Grid> for GridParams {
    fn from(g: Grid) -> Self {
        Self {
            resolution: g.resolution,
            tile_size: i64::from(g.tile_size),
            pad: i64::from(g.pad),
        }
    }
}

// Resolution is always finite, so bitwise equality is total.
impl Eq for Grid {}

impl Hash for Grid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resolution.to_bits().hash(state);
        self.tile_size.hash(state);
        self.pad.hash(state);
    }
}

impl Grid {
    pub fn new(resolution: f64, tile_size: u32, pad: u32) -> Result<Self, TileError> {
        validate_resolution(resolution)?;
        if tile_size == 0 {
            return Err(TileError::InvalidParameter(
                "tile size must be greater than zero".into(),
            ));
        }
        if pad.checked_mul(2).and_then(|p| p.checked_add(tile_size)).is_none() {
            return Err(TileError::InvalidParameter(format!(
                "tile size {tile_size} with pad {pad} overflows the tile extent"
            )));
        }
        Ok(Self {
            resolution,
            tile_size,
            pad,
        })
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Pixels of valid data along one tile edge.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn pad(&self) -> u32 {
        self.pad
    }

    /// Pixels along one edge of a tile raster, including padding.
    pub fn tile_extent(&self) -> u32 {
        self.tile_size + 2 * self.pad
    }

    /// Ground width of a grid cell, without padding.
    pub fn cell_width(&self) -> f64 {
        f64::from(self.tile_size) * self.resolution
    }

    /// Ground width of a tile raster, including padding.
    pub fn extent_width(&self) -> f64 {
        f64::from(self.tile_extent()) * self.resolution
    }

    pub fn pad_width(&self) -> f64 {
        f64::from(self.pad) * self.resolution
    }

    pub fn tile(&self, zone: UtmZone, col: i64, row: i64) -> Tile {
        Tile::new(*self, zone, col, row)
    }

    /// The tile containing a lon/lat point, in the point's own UTM zone.
    pub fn tile_from_lonlat(&self, lon: f64, lat: f64) -> Result<Tile, TileError> {
        let zone = UtmZone::from_lonlat(lon, lat)?;
        let (x, y) = TransverseMercator::utm(&zone).forward_deg(lon, lat)?;
        let (col, row) = self.cell_index(&zone, x, y);
        Ok(self.tile(zone, col, row))
    }

    /// Grid cell `(col, row)` containing projected `(x, y)` in `zone`.
    pub(crate) fn cell_index(&self, zone: &UtmZone, x: f64, y: f64) -> (i64, i64) {
        let w = self.cell_width();
        (
            ((x - zone.false_easting()) / w).floor() as i64,
            ((y - zone.false_northing()) / w).floor() as i64,
        )
    }

    /// Tiles covering `geometry`, in the UTM zone of its centroid.
    ///
    /// The returned cover enumerates lazily; nothing is materialized here
    /// beyond the projected geometry.
    pub fn tiles_from_geometry(&self, geometry: &Geometry) -> Result<TileCover, TileError> {
        let zone = resolve_crs(geometry)?;
        let footprint = geometry.project(&zone)?;
        TileCover::new(*self, zone, footprint)
    }

    /// Rough number of tiles needed to cover `geometry`, from its area in
    /// square degrees scaled by the cosine of each part's latitude.
    pub fn estimate_tile_count(&self, geometry: &Geometry) -> Result<u64, TileError> {
        geometry.validate()?;
        let cell_area = self.cell_width() * self.cell_width();
        let estimate = |polygon: &geo::Polygon<f64>| {
            let lat = polygon.centroid().map(|c| c.y()).unwrap_or(0.0);
            let m2 = polygon.unsigned_area() * M2_PER_DEG2 * lat.to_radians().cos();
            (m2 / cell_area).floor() as u64
        };
        let count = match geometry {
            Geometry::Point(_) => 0,
            Geometry::Polygon(p) => estimate(p),
            Geometry::MultiPolygon(mp) => mp.0.iter().map(estimate).sum(),
        };
        Ok(count)
    }

    /// Parse the leading `tile_size:pad:resolution` fields of a key.
    pub(crate) fn from_key_fields(key: &str, fields: &[&str]) -> Result<Self, TileError> {
        let [tile_size, pad, resolution] = fields else {
            return Err(TileError::key_parse(key, "expected tile_size:pad:resolution"));
        };
        let tile_size: u32 = tile_size
            .parse()
            .map_err(|_| TileError::key_parse(key, format!("invalid tile size {tile_size:?}")))?;
        let pad: u32 = pad
            .parse()
            .map_err(|_| TileError::key_parse(key, format!("invalid pad {pad:?}")))?;
        let resolution: f64 = resolution
            .parse()
            .map_err(|_| TileError::key_parse(key, format!("invalid resolution {resolution:?}")))?;
        Grid::new(resolution, tile_size, pad).map_err(|e| TileError::key_parse(key, e.to_string()))
    }
}

/// Resolution as written in keys: always with a decimal point.
///
/// Uses the shortest form that parses back to the same value, so keys
/// round-trip exactly. This can carry more than six decimals for unusual
/// resolutions.
fn format_resolution(resolution: f64) -> String {
    let mut s = resolution.to_string();
    if !s.contains('.') {
        s.push_str(".0");
    }
    s
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.tile_size,
            self.pad,
            format_resolution(self.resolution)
        )
    }
}

impl FromStr for Grid {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s.split(':').collect::<Vec<_>>();
        Grid::from_key_fields(s, &fields)
    }
}
