//! Tiles: single cells of a [`Grid`] in one UTM zone.

use std::fmt;
use std::str::FromStr;

use geojson::{Feature, GeoJson, JsonObject};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::affine::Affine;
use crate::context::{lonlat_footprint, validate_resolution, Bounds, GeoContext};
use crate::crs::{normalize_lon, UtmZone};
use crate::error::TileError;
use crate::geometry::{GeoInterface, Geometry};
use crate::grid::Grid;
use crate::proj::transverse_mercator::TransverseMercator;
use crate::proj::Projection;
use crate::transform::PixelTransform;

/// Relative tolerance when comparing ground widths computed from different
/// resolution / tile size pairs.
const WIDTH_TOLERANCE: f64 = 1e-9;

/// Identifies a tile: `{tile_size}:{pad}:{resolution}:{zone}:{col}:{row}`.
///
/// `col` counts cells east of the central meridian and `row` cells north of
/// the zone's false origin; both may be negative. The zone is written
/// `15` for 15N and `15S` for 15S.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TileKey {
    pub grid: Grid,
    pub zone: UtmZone,
    pub col: i64,
    pub row: i64,
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.grid, self.zone, self.col, self.row)
    }
}

impl FromStr for TileKey {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s.split(':').collect::<Vec<_>>();
        let &[tile_size, pad, resolution, zone, col, row] = fields.as_slice() else {
            return Err(TileError::key_parse(
                s,
                format!("expected 6 fields, found {}", fields.len()),
            ));
        };
        let grid = Grid::from_key_fields(s, &[tile_size, pad, resolution])?;
        let zone = zone
            .parse::<UtmZone>()
            .map_err(|e| TileError::key_parse(s, e.to_string()))?;
        let col = col
            .parse::<i64>()
            .map_err(|_| TileError::key_parse(s, format!("invalid column {col:?}")))?;
        let row = row
            .parse::<i64>()
            .map_err(|_| TileError::key_parse(s, format!("invalid row {row:?}")))?;
        Ok(Self {
            grid,
            zone,
            col,
            row,
        })
    }
}

impl TryFrom<String> for TileKey {
    type Error = TileError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TileKey> for String {
    fn from(key: TileKey) -> Self {
        key.to_string()
    }
}

/// Overrides for [`Tile::assign`]. Unset fields keep the tile's value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AssignOptions {
    pub resolution: Option<f64>,
    pub tile_size: Option<u32>,
    pub pad: Option<u32>,
}

/// Overrides for [`Tile::subtile`]. Unset fields keep the parent's value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SubtileOptions {
    pub resolution: Option<f64>,
    pub pad: Option<u32>,
}

/// One grid cell: its raster is `tile_extent` pixels square and covers the
/// cell plus `pad` pixels on every side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tile {
    key: TileKey,
}

impl Tile {
    pub fn new(grid: Grid, zone: UtmZone, col: i64, row: i64) -> Self {
        Self {
            key: TileKey {
                grid,
                zone,
                col,
                row,
            },
        }
    }

    /// Rebuild a tile from its key; no geometry is involved.
    pub fn from_key(key: &str) -> Result<Self, TileError> {
        Ok(Self::from(key.parse::<TileKey>()?))
    }

    /// Rebuild a tile from a feature carrying a `key` (or `tilekey`)
    /// property.
    pub fn from_feature(feature: &Feature) -> Result<Self, TileError> {
        let key = ["key", "tilekey"]
            .iter()
            .find_map(|name| feature.property(name).and_then(|v| v.as_str()))
            .ok_or_else(|| {
                TileError::InvalidParameter("feature has no tile key property".into())
            })?;
        Self::from_key(key)
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    pub fn grid(&self) -> Grid {
        self.key.grid
    }

    pub fn zone(&self) -> UtmZone {
        self.key.zone
    }

    pub fn col(&self) -> i64 {
        self.key.col
    }

    pub fn row(&self) -> i64 {
        self.key.row
    }

    pub fn resolution(&self) -> f64 {
        self.key.grid.resolution()
    }

    pub fn tile_size(&self) -> u32 {
        self.key.grid.tile_size()
    }

    pub fn pad(&self) -> u32 {
        self.key.grid.pad()
    }

    pub fn tile_extent(&self) -> u32 {
        self.key.grid.tile_extent()
    }

    /// Projected extent of the cell itself, without padding.
    pub fn bounds(&self) -> Bounds {
        let w = self.grid().cell_width();
        let min_x = self.zone().false_easting() + self.col() as f64 * w;
        let min_y = self.zone().false_northing() + self.row() as f64 * w;
        Bounds::new(min_x, min_y, min_x + w, min_y + w)
    }

    /// Projected extent of the tile raster.
    pub fn padded_bounds(&self) -> Bounds {
        self.bounds().expand(self.grid().pad_width())
    }

    /// Lon/lat footprint of the valid (unpadded) region.
    pub fn geometry(&self) -> Result<Geometry, TileError> {
        lonlat_footprint(&self.zone(), &self.bounds())
    }

    pub fn padded_geometry(&self) -> Result<Geometry, TileError> {
        lonlat_footprint(&self.zone(), &self.padded_bounds())
    }

    /// Lon/lat of the cell center.
    pub fn center(&self) -> Result<(f64, f64), TileError> {
        let (x, y) = self.bounds().center();
        let (lon, lat) = TransverseMercator::utm(&self.zone()).inverse_deg(x, y)?;
        Ok((normalize_lon(lon), lat))
    }

    pub fn epsg(&self) -> u32 {
        self.zone().epsg()
    }

    pub fn cs_code(&self) -> String {
        self.zone().cs_code()
    }

    pub fn proj4(&self) -> String {
        self.zone().proj4()
    }

    pub fn wkt(&self) -> String {
        self.zone().wkt()
    }

    pub fn affine(&self) -> Affine {
        let b = self.padded_bounds();
        Affine::north_up(b.min_x, b.max_y, self.resolution())
    }

    pub fn geotransform(&self) -> [f64; 6] {
        self.affine().to_gdal()
    }

    /// The padded raster extent as a [`GeoContext`].
    pub fn geocontext(&self) -> GeoContext {
        let n = self.tile_extent() as usize;
        GeoContext::from_parts(self.zone(), self.padded_bounds(), self.resolution(), (n, n))
    }

    /// Pixel transform of the padded raster; pixel `(0, 0)` is the
    /// upper-left pixel of the padding.
    pub fn transform(&self) -> Result<PixelTransform, TileError> {
        PixelTransform::new(self.zone(), self.affine())
    }

    pub fn rowcol_to_lonlat(&self, row: f64, col: f64) -> Result<(f64, f64), TileError> {
        self.transform()?.rowcol_to_lonlat(row, col)
    }

    pub fn lonlat_to_rowcol(&self, lon: f64, lat: f64) -> Result<(f64, f64), TileError> {
        self.transform()?.lonlat_to_rowcol(lon, lat)
    }

    pub fn lonlat_to_pixel(&self, lon: f64, lat: f64) -> Result<(i64, i64), TileError> {
        self.transform()?.lonlat_to_pixel(lon, lat)
    }

    /// True iff `(lon, lat)` lies in the unpadded cell. The western and
    /// southern edges belong to the cell, so adjacent tiles never both
    /// contain a point.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        match TransverseMercator::utm(&self.zone()).forward_deg(lon, lat) {
            Ok((x, y)) => self.bounds().contains(x, y),
            Err(_) => false,
        }
    }

    /// Same cell position with some grid parameters replaced.
    ///
    /// Changing the resolution or tile size alone changes the cell width and
    /// therefore the ground region; changing both must keep the width.
    pub fn assign(&self, opts: AssignOptions) -> Result<Tile, TileError> {
        let resolution = opts.resolution.unwrap_or(self.resolution());
        let tile_size = opts.tile_size.unwrap_or(self.tile_size());
        let pad = opts.pad.unwrap_or(self.pad());
        let grid = Grid::new(resolution, tile_size, pad)?;

        if opts.resolution.is_some()
            && opts.tile_size.is_some()
            && !same_width(grid.cell_width(), self.grid().cell_width())
        {
            return Err(TileError::InvalidParameter(format!(
                "resolution {resolution} and tile size {tile_size} do not span the \
                 same {} m as the current grid",
                self.grid().cell_width()
            )));
        }
        Ok(Tile::new(grid, self.zone(), self.col(), self.row()))
    }

    /// Split the cell into `subdivide`² subtiles, upper-left first, row by
    /// row. Their cells exactly partition this one.
    pub fn subtile(&self, subdivide: u32, opts: SubtileOptions) -> Result<Subtiles, TileError> {
        let grid = self.subtile_grid(subdivide, opts)?;
        let s = i64::from(subdivide);
        let overflow = || {
            TileError::InvalidParameter(format!(
                "subdividing tile {self} by {subdivide} overflows the grid index"
            ))
        };
        // the last subtile column and the first subtile row must fit as well
        let ul_col = self
            .col()
            .checked_mul(s)
            .filter(|c| c.checked_add(s - 1).is_some())
            .ok_or_else(overflow)?;
        let ul_row = self
            .row()
            .checked_mul(s)
            .and_then(|r| r.checked_add(s - 1))
            .ok_or_else(overflow)?;
        Ok(Subtiles {
            grid,
            zone: self.zone(),
            ul_col,
            ul_row,
            subdivide,
            next: 0,
        })
    }

    /// The subtile at `(row, col)` counted from the upper-left.
    pub fn subtile_at(
        &self,
        subdivide: u32,
        row: u32,
        col: u32,
        opts: SubtileOptions,
    ) -> Result<Tile, TileError> {
        if row >= subdivide || col >= subdivide {
            return Err(TileError::InvalidParameter(format!(
                "subtile ({row}, {col}) is outside a {subdivide}x{subdivide} subdivision"
            )));
        }
        Ok(self.subtile(subdivide, opts)?.at(row, col))
    }

    fn subtile_grid(&self, subdivide: u32, opts: SubtileOptions) -> Result<Grid, TileError> {
        if subdivide == 0 || self.tile_size() % subdivide != 0 {
            return Err(TileError::InvalidParameter(format!(
                "subdivide ratio {subdivide} must evenly divide the tile size {}",
                self.tile_size()
            )));
        }
        let resolution = opts.resolution.unwrap_or(self.resolution());
        let pad = opts.pad.unwrap_or(self.pad());
        validate_resolution(resolution)?;

        let width = self.grid().cell_width() / f64::from(subdivide);
        let tile_size = width / resolution;
        let rounded = tile_size.round();
        if rounded < 1.0 || !same_width(rounded * resolution, width) {
            return Err(TileError::InvalidParameter(format!(
                "a subtile spans {width} m, which is not a whole number of {resolution} m pixels"
            )));
        }
        Grid::new(resolution, rounded as u32, pad)
    }

    /// GeoJSON feature of the valid footprint, with the tile's properties.
    ///
    /// Fails when the footprint has no lon/lat preimage, which only happens
    /// for cells far outside their zone.
    pub fn feature(&self) -> Result<Feature, TileError> {
        let geometry = self.geometry()?;
        let mut properties = JsonObject::new();
        properties.insert("key".into(), json!(self.key.to_string()));
        properties.insert("resolution".into(), json!(self.resolution()));
        properties.insert("tilesize".into(), json!(self.tile_size()));
        properties.insert("pad".into(), json!(self.pad()));
        properties.insert("cs_code".into(), json!(self.cs_code()));
        properties.insert("zone".into(), json!(self.zone().number()));
        properties.insert("zone_designator".into(), json!(self.zone().to_string()));
        properties.insert("ti".into(), json!(self.col()));
        properties.insert("tj".into(), json!(self.row()));
        properties.insert("outputBounds".into(), json!(self.padded_bounds().to_array()));
        properties.insert("size".into(), json!([self.tile_extent(), self.tile_extent()]));
        properties.insert("geoTransform".into(), json!(self.geotransform()));
        properties.insert("proj4".into(), json!(self.proj4()));
        properties.insert("wkt".into(), json!(self.wkt()));
        Ok(Feature {
            bbox: None,
            geometry: Some(geometry.to_geojson()),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        })
    }
}

fn same_width(a: f64, b: f64) -> bool {
    (a - b).abs() <= WIDTH_TOLERANCE * a.abs().max(b.abs())
}

impl From<TileKey> for Tile {
    fn from(key: TileKey) -> Self {
        Self { key }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}

impl FromStr for Tile {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tile::from_key(s)
    }
}

impl TryFrom<String> for Tile {
    type Error = TileError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Tile::from_key(&s)
    }
}

impl From<Tile> for String {
    fn from(tile: Tile) -> Self {
        tile.key.to_string()
    }
}

impl GeoInterface for Tile {
    fn geo_interface(&self) -> Result<GeoJson, TileError> {
        self.feature().map(GeoJson::Feature)
    }
}

/// The subtiles of one tile, upper-left first, west to east then north to
/// south.
#[derive(Clone, Debug)]
pub struct Subtiles {
    grid: Grid,
    zone: UtmZone,
    ul_col: i64,
    ul_row: i64,
    subdivide: u32,
    next: u64,
}

impl Subtiles {
    fn total(&self) -> u64 {
        u64::from(self.subdivide) * u64::from(self.subdivide)
    }

    fn at(&self, row: u32, col: u32) -> Tile {
        self.grid.tile(
            self.zone,
            self.ul_col + i64::from(col),
            self.ul_row - i64::from(row),
        )
    }
}

impl Iterator for Subtiles {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        if self.next >= self.total() {
            return None;
        }
        let s = u64::from(self.subdivide);
        let (row, col) = ((self.next / s) as u32, (self.next % s) as u32);
        self.next += 1;
        Some(self.at(row, col))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.total() - self.next) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Subtiles {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Hemisphere;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_key() {
        let tile = Tile::from_key("2048:16:30.2:15:3:80").unwrap();
        assert_eq!(tile.to_string(), "2048:16:30.2:15:3:80");
        assert_eq!(tile.zone(), UtmZone::new(15, Hemisphere::North).unwrap());
        assert_eq!(tile.resolution(), 30.2);
        assert_eq!(tile.tile_size(), 2048);
        assert_eq!((tile.col(), tile.row()), (3, 80));

        let tile = Tile::from_key("2048:16:30:15:-5:15").unwrap();
        assert_eq!(tile.to_string(), "2048:16:30.0:15:-5:15");
        assert_eq!(tile.col(), -5);

        let south = Tile::from_key("512:0:10.0:56S:-4:-500").unwrap();
        assert_eq!(south.zone().hemisphere(), Hemisphere::South);
        assert_eq!(south.to_string(), "512:0:10.0:56S:-4:-500");
    }

    #[test]
    fn test_invalid_keys() {
        for key in [
            "2048:16:30.0:0:3:80",
            "blah:16:30.0:1:3:80",
            "2048:16.4:30.0:15:3:80",
            "0:16:30.0:15:3:80",
            "2048:16:-30.0:15:3:80",
            "2048:16:30.0:61:3:80",
            "2048:16:30.0:15:3",
            "2048:16:30.0:15:3:80:1",
            "2048:16:30.0:15:x:80",
        ] {
            assert!(
                matches!(Tile::from_key(key), Err(TileError::KeyParse { .. })),
                "{key}"
            );
        }
    }

    #[test]
    fn test_padded_bounds_and_descriptions() {
        let tile = Tile::from_key("128:16:960.0:15:-1:37").unwrap();
        assert_eq!(
            tile.padded_bounds(),
            Bounds::new(361_760.0, 4_531_200.0, 515_360.0, 4_684_800.0)
        );
        assert_eq!(
            tile.geotransform(),
            [361_760.0, 960.0, 0.0, 4_684_800.0, 0.0, -960.0]
        );
        assert_eq!(tile.cs_code(), "EPSG:32615");
        assert_eq!(
            tile.wkt(),
            concat!(
                r#"PROJCS["WGS 84 / UTM zone 15N",GEOGCS["WGS 84",DATUM["WGS_1984","#,
                r#"SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],"#,
                r#"AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],"#,
                r#"UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],"#,
                r#"AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],"#,
                r#"PARAMETER["latitude_of_origin",0],PARAMETER["central_meridian",-93],"#,
                r#"PARAMETER["scale_factor",0.9996],PARAMETER["false_easting",500000],"#,
                r#"PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],"#,
                r#"AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","32615"]]"#,
            )
        );

        let ctx = tile.geocontext();
        assert_eq!(ctx.shape(), (160, 160));
        assert_eq!(ctx.bounds(), tile.padded_bounds());
    }

    #[test]
    fn test_padding_symmetry() {
        let tile = Tile::from_key("2048:16:30.0:15:3:80").unwrap();
        let (b, p) = (tile.bounds(), tile.padded_bounds());
        for (inner, outer) in [
            (b.min_x, p.min_x + 480.0),
            (b.min_y, p.min_y + 480.0),
            (b.max_x, p.max_x - 480.0),
            (b.max_y, p.max_y - 480.0),
        ] {
            assert_relative_eq!(inner, outer);
        }
        assert_relative_eq!(p.width(), 62_400.0);
    }

    #[test]
    fn test_reference_pixel_transforms() {
        let tile = Tile::from_key("2048:0:30.0:15:3:80").unwrap();
        let (lon, lat) = tile.rowcol_to_lonlat(56.0, 1111.0).unwrap();
        assert_relative_eq!(lat, 44.894653081367544, epsilon = 1e-6);
        assert_relative_eq!(lon, -90.24334206726267, epsilon = 1e-6);
        assert_eq!(tile.lonlat_to_pixel(-90.2, 44.8).unwrap(), (403, 1237));
    }

    #[test]
    fn test_rowcol_roundtrip_over_padded_extent() {
        let tile = Tile::from_key("256:8:10.0:33S:12:-300").unwrap();
        let transform = tile.transform().unwrap();
        for &(row, col) in &[(0.0, 0.0), (5.0, 23.0), (271.0, 271.0), (130.25, 7.75)] {
            let (lon, lat) = transform.rowcol_to_lonlat(row, col).unwrap();
            let (r, c) = transform.lonlat_to_rowcol(lon, lat).unwrap();
            assert_relative_eq!(r, row, epsilon = 1e-6);
            assert_relative_eq!(c, col, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_contains_is_half_open() {
        let tile = Tile::from_key("1024:4:1.0:13:-10:3877").unwrap();
        let (lon, lat) = tile.center().unwrap();
        assert!(tile.contains(lon, lat));

        let tm = TransverseMercator::utm(&tile.zone());
        let b = tile.bounds();
        let (lon, lat) = tm.inverse_deg(b.min_x + 0.001, b.min_y + 0.001).unwrap();
        assert!(tile.contains(lon, lat));
        let (lon, lat) = tm.inverse_deg(b.max_x + 0.001, b.min_y + 0.5).unwrap();
        assert!(!tile.contains(lon, lat));
        // inside the padding is outside the tile
        let (lon, lat) = tm.inverse_deg(b.min_x - 2.0, b.min_y + 10.0).unwrap();
        assert!(!tile.contains(lon, lat));
        assert!(!tile.contains(f64::NAN, 0.0));
    }

    #[test]
    fn test_assign() {
        let tile = Tile::from_key("2048:16:0.2:15:3:80").unwrap();
        let repadded = tile
            .assign(AssignOptions {
                pad: Some(0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(repadded.to_string(), "2048:0:0.2:15:3:80");
        assert_eq!(repadded.bounds(), tile.bounds());

        let coarser = tile
            .assign(AssignOptions {
                resolution: Some(1.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(coarser.resolution(), 1.0);
        assert_eq!((coarser.pad(), coarser.tile_size()), (16, 2048));
        assert_eq!(tile.resolution(), 0.2);

        let resized = tile
            .assign(AssignOptions {
                resolution: Some(0.4),
                tile_size: Some(1024),
                pad: None,
            })
            .unwrap();
        assert_eq!(resized.bounds(), tile.bounds());

        assert!(matches!(
            tile.assign(AssignOptions {
                resolution: Some(1.0),
                tile_size: Some(512),
                pad: None,
            }),
            Err(TileError::InvalidParameter(_))
        ));
        assert!(tile
            .assign(AssignOptions {
                resolution: Some(-1.0),
                ..Default::default()
            })
            .is_err());
    }

    #[test]
    fn test_subtile_partitions_parent() {
        let tile = Grid::new(1.0, 1024, 0)
            .unwrap()
            .tile_from_lonlat(-105.944183, 35.691544)
            .unwrap();
        let subtiles: Vec<Tile> = tile.subtile(8, SubtileOptions::default()).unwrap().collect();
        assert_eq!(subtiles.len(), 64);
        assert!(subtiles.iter().all(|t| t.tile_size() == 128));

        // upper-left first, then west to east
        let parent = tile.bounds();
        let first = subtiles[0].bounds();
        assert_relative_eq!(first.min_x, parent.min_x);
        assert_relative_eq!(first.max_y, parent.max_y);
        assert_relative_eq!(subtiles[1].bounds().min_x, first.max_x);
        let last = subtiles[63].bounds();
        assert_relative_eq!(last.max_x, parent.max_x);
        assert_relative_eq!(last.min_y, parent.min_y);

        let area: f64 = subtiles.iter().map(|t| t.bounds().width() * t.bounds().height()).sum();
        assert_relative_eq!(area, parent.width() * parent.height());

        let at = tile.subtile_at(8, 2, 5, SubtileOptions::default()).unwrap();
        assert_eq!(at, subtiles[2 * 8 + 5]);
        assert!(tile.subtile_at(8, 8, 0, SubtileOptions::default()).is_err());
    }

    #[test]
    fn test_subtile_index_overflow() {
        let opts = SubtileOptions::default();
        let east = Tile::from_key("2048:0:1.0:15:9223372036854775807:0").unwrap();
        assert!(matches!(east.subtile(2, opts), Err(TileError::InvalidParameter(_))));
        let north = Tile::from_key("2048:0:1.0:15:0:4611686018427387904").unwrap();
        assert!(matches!(north.subtile(2, opts), Err(TileError::InvalidParameter(_))));
        let south = Tile::from_key("2048:0:1.0:15:0:-4611686018427387904").unwrap();
        assert_eq!(south.subtile(2, opts).unwrap().count(), 4);
    }

    #[test]
    fn test_subtile_with_options() {
        let tile = Grid::new(1.0, 1024, 0)
            .unwrap()
            .tile_from_lonlat(-105.944183, 35.691544)
            .unwrap();
        let opts = SubtileOptions {
            resolution: Some(2.0),
            pad: Some(13),
        };
        let subtiles: Vec<Tile> = tile.subtile(4, opts).unwrap().collect();
        assert_eq!(subtiles.len(), 16);
        for t in &subtiles {
            assert_eq!(t.tile_size(), 128);
            assert_eq!(t.pad(), 13);
            assert_eq!(t.resolution(), 2.0);
        }

        assert!(matches!(
            tile.subtile(11, SubtileOptions::default()),
            Err(TileError::InvalidParameter(_))
        ));
        let odd = SubtileOptions {
            resolution: Some(13.0),
            pad: None,
        };
        assert!(matches!(tile.subtile(8, odd), Err(TileError::InvalidParameter(_))));
    }

    #[test]
    fn test_feature_roundtrip() {
        let tile = Tile::from_key("2048:16:30.0:15:3:80").unwrap();
        let feature = tile.feature().unwrap();
        let props = feature.properties.as_ref().unwrap();
        assert_eq!(props["key"], "2048:16:30.0:15:3:80");
        assert_eq!(props["ti"], 3);
        assert_eq!(props["tj"], 80);
        assert_eq!(props["size"], json!([2080, 2080]));
        assert_eq!(Tile::from_feature(&feature).unwrap(), tile);

        // the feature geometry is the unpadded footprint
        let geometry = Geometry::try_from(feature).unwrap();
        let (lon, lat) = geometry.centroid().unwrap();
        assert!(tile.contains(lon, lat));
        assert!(Geometry::from_geo_interface(&tile).is_ok());
    }

    #[test]
    fn test_feature_fails_without_footprint() {
        // a cell on the equator far east of its zone has no lon/lat preimage
        let tile = Tile::from_key("2048:16:30.0:15:1000000000000000:0").unwrap();
        assert!(matches!(tile.feature(), Err(TileError::Projection(_))));
        assert!(matches!(
            Geometry::from_geo_interface(&tile),
            Err(TileError::Projection(_))
        ));
    }

    #[test]
    fn test_serde_as_key_string() {
        let tile = Tile::from_key("512:8:10.0:56S:-4:-500").unwrap();
        let text = serde_json::to_string(&tile).unwrap();
        assert_eq!(text, r#""512:8:10.0:56S:-4:-500""#);
        assert_eq!(serde_json::from_str::<Tile>(&text).unwrap(), tile);
        assert!(serde_json::from_str::<TileKey>(r#""512:8:10.0""#).is_err());
    }

    #[test]
    fn test_antimeridian_tile_geometry() {
        // zone 60 cell straddling 180°
        let grid = Grid::new(100.0, 1000, 0).unwrap();
        let zone = UtmZone::new(60, Hemisphere::North).unwrap();
        let tm = TransverseMercator::utm(&zone);
        let (x, y) = tm.forward_deg(180.0, 10.0).unwrap();
        let (col, row) = grid.cell_index(&zone, x, y);
        let tile = grid.tile(zone, col, row);
        assert!(matches!(tile.geometry().unwrap(), Geometry::MultiPolygon(_)));
        assert!(tile.contains(179.99, 10.0) || tile.contains(-179.99, 10.0));
    }
}
