//! Projected raster extents: a UTM zone, output bounds and a pixel grid.

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon, Rect};
use geojson::{Feature, GeoJson, JsonObject};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::affine::Affine;
use crate::crs::{normalize_lon, UtmZone};
use crate::error::TileError;
use crate::geometry::{GeoInterface, Geometry};
use crate::proj::transverse_mercator::TransverseMercator;
use crate::proj::Projection;
use crate::transform::PixelTransform;

/// Axis-aligned bounds `(min_x, min_y, max_x, max_y)` in projected units
/// (or degrees, for lon/lat bounds).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Grow by `d` on all four sides.
    pub fn expand(&self, d: f64) -> Self {
        Self::new(self.min_x - d, self.min_y - d, self.max_x + d, self.max_y + d)
    }

    /// Half-open containment: the western and southern edges are inside,
    /// the eastern and northern edges belong to the neighbour.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.min_x,
                y: self.min_y,
            },
            Coord {
                x: self.max_x,
                y: self.max_y,
            },
        )
    }

    fn validate(&self) -> Result<(), TileError> {
        let finite = self.to_array().iter().all(|v| v.is_finite());
        if !finite || self.min_x >= self.max_x || self.min_y >= self.max_y {
            return Err(TileError::InvalidParameter(format!(
                "bounds must be finite with min < max, got {:?}",
                self.to_array()
            )));
        }
        Ok(())
    }
}

impl From<[f64; 4]> for Bounds {
    fn from(b: [f64; 4]) -> Self {
        Self::new(b[0], b[1], b[2], b[3])
    }
}

/// A north-up raster extent in a UTM zone.
///
/// `bounds` is the full output extent and `shape` is `(rows, cols)`, so
/// `bounds.width() == shape.1 * resolution` always holds.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoContext {
    zone: UtmZone,
    bounds: Bounds,
    resolution: f64,
    shape: (usize, usize),
}

pub(crate) fn validate_resolution(resolution: f64) -> Result<(), TileError> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(TileError::InvalidParameter(format!(
            "resolution must be a positive number, got {resolution}"
        )));
    }
    Ok(())
}

impl GeoContext {
    /// Used by tiles, whose bounds are exact multiples of the resolution.
    pub(crate) fn from_parts(
        zone: UtmZone,
        bounds: Bounds,
        resolution: f64,
        shape: (usize, usize),
    ) -> Self {
        Self {
            zone,
            bounds,
            resolution,
            shape,
        }
    }

    /// Build a context covering `bounds` (projected, in `zone`).
    ///
    /// The pixel count on each axis is rounded up so the whole extent is
    /// covered; the max edges move out to a whole number of pixels. With
    /// `align_pixels` the min edges first snap down to a multiple of the
    /// resolution, so contexts built from different bounds share pixel edges.
    pub fn from_bounds(
        zone: UtmZone,
        bounds: Bounds,
        resolution: f64,
        align_pixels: bool,
    ) -> Result<Self, TileError> {
        validate_resolution(resolution)?;
        bounds.validate()?;

        let (min_x, min_y) = if align_pixels {
            (
                (bounds.min_x / resolution).floor() * resolution,
                (bounds.min_y / resolution).floor() * resolution,
            )
        } else {
            (bounds.min_x, bounds.min_y)
        };
        let cols = pixel_count(bounds.max_x - min_x, resolution);
        let rows = pixel_count(bounds.max_y - min_y, resolution);
        let bounds = Bounds::new(
            min_x,
            min_y,
            min_x + cols as f64 * resolution,
            min_y + rows as f64 * resolution,
        );
        tracing::debug!(zone = %zone, rows, cols, resolution, "built geocontext");
        Ok(Self::from_parts(zone, bounds, resolution, (rows, cols)))
    }

    /// Build a context from lon/lat bounds, in the UTM zone of their center.
    pub fn from_lonlat_bounds(
        lonlat: Bounds,
        resolution: f64,
        align_pixels: bool,
    ) -> Result<Self, TileError> {
        lonlat.validate()?;
        let geometry = Geometry::from(lonlat.to_rect());
        geometry.validate()?;
        let (lon, lat) = lonlat.center();
        let zone = UtmZone::from_lonlat(lon, lat)?;
        let projected = geometry
            .project(&zone)?
            .bounds()
            .ok_or_else(|| TileError::InvalidGeometry("bounds have no extent".into()))?;
        let bounds = Bounds::new(
            projected.min().x,
            projected.min().y,
            projected.max().x,
            projected.max().y,
        );
        Self::from_bounds(zone, bounds, resolution, align_pixels)
    }

    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn cs_code(&self) -> String {
        self.zone.cs_code()
    }

    pub fn affine(&self) -> Affine {
        Affine::north_up(self.bounds.min_x, self.bounds.max_y, self.resolution)
    }

    /// GDAL-order geotransform `(left, res, 0, top, 0, -res)`.
    pub fn geotransform(&self) -> [f64; 6] {
        self.affine().to_gdal()
    }

    /// Footprint of the full extent in lon/lat.
    pub fn geometry(&self) -> Result<Geometry, TileError> {
        lonlat_footprint(&self.zone, &self.bounds)
    }

    pub fn transform(&self) -> Result<PixelTransform, TileError> {
        PixelTransform::new(self.zone, self.affine())
    }
}

/// Number of pixels needed to span `extent`. Extents within a nanometre-ish
/// relative tolerance of a whole pixel count are not rounded up.
fn pixel_count(extent: f64, resolution: f64) -> usize {
    let n = extent / resolution;
    let rounded = n.round();
    if (n - rounded).abs() < 1e-9 * rounded.max(1.0) {
        rounded.max(1.0) as usize
    } else {
        n.ceil().max(1.0) as usize
    }
}

/// Inverse-project the corners of projected `bounds` into a lon/lat polygon.
///
/// A box that straddles the antimeridian comes back as a MultiPolygon split
/// at ±180°. Boxes containing a pole are not special-cased.
pub(crate) fn lonlat_footprint(zone: &UtmZone, bounds: &Bounds) -> Result<Geometry, TileError> {
    let tm = TransverseMercator::utm(zone);
    let corners = [
        (bounds.min_x, bounds.min_y),
        (bounds.max_x, bounds.min_y),
        (bounds.max_x, bounds.max_y),
        (bounds.min_x, bounds.max_y),
    ];
    let mut ring = Vec::with_capacity(5);
    for (x, y) in corners {
        let (lon, lat) = tm.inverse_deg(x, y)?;
        ring.push(Coord {
            x: normalize_lon(lon),
            y: lat,
        });
    }
    ring.push(ring[0]);

    let (min_lon, max_lon) = ring
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
            (lo.min(c.x), hi.max(c.x))
        });
    if max_lon - min_lon <= 180.0 {
        return Ok(Geometry::Polygon(Polygon::new(LineString::new(ring), vec![])));
    }

    tracing::trace!(zone = %zone, "splitting footprint at the antimeridian");
    let shifted = |toward_west: bool| {
        let coords = ring
            .iter()
            .map(|c| match (toward_west, c.x >= 0.0) {
                (true, true) => Coord { x: c.x - 360.0, y: c.y },
                (false, false) => Coord { x: c.x + 360.0, y: c.y },
                _ => *c,
            })
            .collect::<Vec<_>>();
        Polygon::new(LineString::new(coords), vec![])
    };
    let hemisphere = |west: f64, east: f64| {
        Rect::new(Coord { x: west, y: -90.0 }, Coord { x: east, y: 90.0 }).to_polygon()
    };
    let western = shifted(true).intersection(&hemisphere(-180.0, 0.0));
    let eastern = shifted(false).intersection(&hemisphere(0.0, 180.0));
    let parts = western.0.into_iter().chain(eastern.0).collect::<Vec<_>>();
    Ok(Geometry::MultiPolygon(MultiPolygon::new(parts)))
}

impl GeoInterface for GeoContext {
    fn geo_interface(&self) -> Result<GeoJson, TileError> {
        let geometry = self.geometry()?;
        let mut properties = JsonObject::new();
        properties.insert("cs_code".into(), json!(self.cs_code()));
        properties.insert("zone".into(), json!(self.zone.to_string()));
        properties.insert("resolution".into(), json!(self.resolution));
        properties.insert("outputBounds".into(), json!(self.bounds.to_array()));
        properties.insert("size".into(), json!([self.shape.1, self.shape.0]));
        properties.insert("geoTransform".into(), json!(self.geotransform()));
        Ok(GeoJson::Feature(Feature {
            bbox: None,
            geometry: Some(geometry.to_geojson()),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }))
    }
}
