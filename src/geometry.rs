//! The geometry accepted by the tiling engine.
//!
//! Every external representation (geo-types values, GeoJSON geometries,
//! features and feature collections, GeoJSON text, or anything implementing
//! [`GeoInterface`]) is normalized into [`Geometry`] before the tiling code
//! sees it. Coordinates are WGS84 longitude/latitude degrees.

use std::str::FromStr;

use geo::{
    Area, BoundingRect, Centroid, Contains, Coord, CoordsIter, Intersects, LineString, MapCoords,
    MultiPolygon, Point, Polygon, Rect,
};
use geojson::GeoJson;

use crate::crs::{normalize_lon, UtmZone};
use crate::error::TileError;
use crate::proj::transverse_mercator::TransverseMercator;
use crate::proj::Projection;

/// Longest edge, in degrees, left undivided when projecting a ring.
const DENSIFY_STEP_DEG: f64 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Point(Point<f64>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

/// Objects that can describe themselves as GeoJSON.
pub trait GeoInterface {
    fn geo_interface(&self) -> Result<GeoJson, TileError>;
}

impl Geometry {
    /// Normalize anything exposing a GeoJSON interface.
    pub fn from_geo_interface<G: GeoInterface + ?Sized>(obj: &G) -> Result<Self, TileError> {
        Geometry::try_from(obj.geo_interface()?)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(_) => false,
            Geometry::Polygon(p) => p.exterior().0.is_empty(),
            Geometry::MultiPolygon(mp) => mp.0.iter().all(|p| p.exterior().0.is_empty()),
        }
    }

    fn coords(&self) -> Box<dyn Iterator<Item = Coord<f64>> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(p.0)),
            Geometry::Polygon(p) => Box::new(p.coords_iter()),
            Geometry::MultiPolygon(mp) => Box::new(mp.coords_iter()),
        }
    }

    /// Reject empty geometries and coordinates that are not WGS84 lon/lat.
    pub fn validate(&self) -> Result<(), TileError> {
        if self.is_empty() {
            return Err(TileError::InvalidGeometry("geometry is empty".into()));
        }
        for c in self.coords() {
            if !c.x.is_finite() || !c.y.is_finite() {
                return Err(TileError::InvalidGeometry(format!(
                    "non-finite coordinate ({}, {})",
                    c.x, c.y
                )));
            }
            if !(-180.0..=180.0).contains(&c.x) {
                return Err(TileError::InvalidGeometry(format!(
                    "longitude {} outside [-180, 180]",
                    c.x
                )));
            }
            if !(-90.0..=90.0).contains(&c.y) {
                return Err(TileError::InvalidGeometry(format!(
                    "latitude {} outside [-90, 90]",
                    c.y
                )));
            }
        }
        Ok(())
    }

    /// True when the longitude extent exceeds 180°, which for valid input
    /// means the geometry wraps around the antimeridian.
    pub fn crosses_antimeridian(&self) -> bool {
        let (min, max) = self
            .coords()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c.x), hi.max(c.x))
            });
        max - min > 180.0
    }

    /// Copy with western longitudes shifted by +360° if the geometry crosses
    /// the antimeridian, so it is contiguous in longitude.
    fn unwrapped(&self) -> Geometry {
        if !self.crosses_antimeridian() {
            return self.clone();
        }
        let shift = |c: Coord<f64>| Coord {
            x: if c.x < 0.0 { c.x + 360.0 } else { c.x },
            y: c.y,
        };
        match self {
            Geometry::Point(p) => Geometry::Point(p.map_coords(shift)),
            Geometry::Polygon(p) => Geometry::Polygon(p.map_coords(shift)),
            Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp.map_coords(shift)),
        }
    }

    /// Centroid as (lon, lat), longitude normalized to [-180, 180).
    ///
    /// Zero-area polygons fall back to the centroid of their outline.
    pub fn centroid(&self) -> Result<(f64, f64), TileError> {
        let centroid = match self.unwrapped() {
            Geometry::Point(p) => Some(p),
            Geometry::Polygon(p) => p.centroid(),
            Geometry::MultiPolygon(mp) => mp.centroid(),
        };
        let c = centroid
            .ok_or_else(|| TileError::InvalidGeometry("geometry has no centroid".into()))?;
        Ok((normalize_lon(c.x()), c.y()))
    }

    /// Bounding box in lon/lat. Antimeridian-crossing geometries report the
    /// unwrapped box, whose eastern edge exceeds 180°.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        match self.unwrapped() {
            Geometry::Point(p) => Some(Rect::new(p.0, p.0)),
            Geometry::Polygon(p) => p.bounding_rect(),
            Geometry::MultiPolygon(mp) => mp.bounding_rect(),
        }
    }

    /// Planar area in square degrees.
    pub fn area_deg2(&self) -> f64 {
        match self.unwrapped() {
            Geometry::Point(_) => 0.0,
            Geometry::Polygon(p) => p.unsigned_area(),
            Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        }
    }

    /// Project into a UTM zone, densifying long edges so the projected
    /// outline follows the lon/lat edges.
    pub(crate) fn project(&self, zone: &UtmZone) -> Result<Footprint, TileError> {
        let projector = RingProjector::new(zone);
        let mut footprint = Footprint::default();
        match self {
            Geometry::Point(p) => footprint.points.push(projector.project(p.0)?),
            Geometry::Polygon(p) => footprint.push_polygon(projector.project_polygon(p)?),
            Geometry::MultiPolygon(mp) => {
                for polygon in &mp.0 {
                    footprint.push_polygon(projector.project_polygon(polygon)?);
                }
            }
        }
        Ok(footprint)
    }

    pub fn to_geojson(&self) -> geojson::Geometry {
        let value = match self {
            Geometry::Point(p) => geojson::Value::from(p),
            Geometry::Polygon(p) => geojson::Value::from(p),
            Geometry::MultiPolygon(mp) => geojson::Value::from(mp),
        };
        geojson::Geometry::new(value)
    }
}

struct RingProjector {
    tm: TransverseMercator,
    zone: UtmZone,
    cm: f64,
}

impl RingProjector {
    fn new(zone: &UtmZone) -> Self {
        Self {
            tm: TransverseMercator::utm(zone),
            zone: *zone,
            cm: zone.central_meridian(),
        }
    }

    /// Longitude re-expressed within ±180° of the central meridian, so
    /// rings crossing the antimeridian stay contiguous.
    fn unwrap(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.cm + normalize_lon(c.x - self.cm),
            y: c.y,
        }
    }

    fn project(&self, c: Coord<f64>) -> Result<Coord<f64>, TileError> {
        let (x, y) = self.tm.forward_deg(c.x, c.y).map_err(|e| {
            TileError::InvalidGeometry(format!(
                "({}, {}) cannot be projected into UTM zone {}: {e}",
                c.x, c.y, self.zone
            ))
        })?;
        Ok(Coord { x, y })
    }

    fn project_ring(&self, ring: &LineString<f64>) -> Result<LineString<f64>, TileError> {
        let mut out = Vec::with_capacity(ring.0.len());
        let mut prev: Option<Coord<f64>> = None;
        for &c in &ring.0 {
            let cur = self.unwrap(c);
            if let Some(p) = prev {
                let span = (cur.x - p.x).abs().max((cur.y - p.y).abs());
                let steps = (span / DENSIFY_STEP_DEG).ceil() as usize;
                for i in 1..steps {
                    let t = i as f64 / steps as f64;
                    out.push(self.project(p + (cur - p) * t)?);
                }
            }
            out.push(self.project(cur)?);
            prev = Some(cur);
        }
        Ok(LineString::new(out))
    }

    fn project_polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>, TileError> {
        let exterior = self.project_ring(polygon.exterior())?;
        let interiors = polygon
            .interiors()
            .iter()
            .map(|ring| self.project_ring(ring))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Polygon::new(exterior, interiors))
    }
}

/// A geometry in projected (or pixel) coordinates, split by dimension so
/// that degenerate inputs still intersect the cells that hold them.
#[derive(Clone, Debug, Default)]
pub(crate) struct Footprint {
    pub(crate) areas: Vec<Polygon<f64>>,
    pub(crate) lines: Vec<LineString<f64>>,
    pub(crate) points: Vec<Coord<f64>>,
}

impl Footprint {
    fn push_polygon(&mut self, polygon: Polygon<f64>) {
        if polygon.unsigned_area() > 0.0 {
            self.areas.push(polygon);
            return;
        }
        let first = polygon.exterior().0.first().copied();
        match first {
            Some(c) if polygon.exterior().0.iter().all(|&p| p == c) => self.points.push(c),
            Some(_) => self.lines.push(polygon.exterior().clone()),
            None => {}
        }
    }

    pub(crate) fn bounds(&self) -> Option<Rect<f64>> {
        let rects = self
            .areas
            .iter()
            .filter_map(|p| p.bounding_rect())
            .chain(self.lines.iter().filter_map(|l| l.bounding_rect()))
            .chain(self.points.iter().map(|&c| Rect::new(c, c)));
        rects.reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
    }

    /// Closed intersection test against an axis-aligned rectangle.
    pub(crate) fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        self.areas.iter().any(|p| p.intersects(rect))
            || self.lines.iter().any(|l| l.intersects(rect))
            || self.points.iter().any(|c| rect.intersects(c))
    }

    /// True when a single polygonal part covers the whole rectangle.
    pub(crate) fn contains_rect(&self, rect: &Rect<f64>) -> bool {
        self.areas.iter().any(|p| p.contains(rect))
    }

    pub(crate) fn intersects_coord(&self, c: Coord<f64>) -> bool {
        self.areas.iter().any(|p| p.intersects(&c))
            || self.lines.iter().any(|l| l.intersects(&c))
            || self.points.iter().any(|&p| p == c)
    }

    pub(crate) fn map(&self, f: impl Fn(Coord<f64>) -> Coord<f64> + Copy) -> Footprint {
        Footprint {
            areas: self.areas.iter().map(|p| p.map_coords(f)).collect(),
            lines: self.lines.iter().map(|l| l.map_coords(f)).collect(),
            points: self.points.iter().map(|&c| f(c)).collect(),
        }
    }
}

impl From<Point<f64>> for Geometry {
    fn from(p: Point<f64>) -> Self {
        Geometry::Point(p)
    }
}

impl From<Polygon<f64>> for Geometry {
    fn from(p: Polygon<f64>) -> Self {
        Geometry::Polygon(p)
    }
}

impl From<MultiPolygon<f64>> for Geometry {
    fn from(mp: MultiPolygon<f64>) -> Self {
        Geometry::MultiPolygon(mp)
    }
}

impl From<Rect<f64>> for Geometry {
    fn from(r: Rect<f64>) -> Self {
        Geometry::Polygon(r.to_polygon())
    }
}

impl TryFrom<geo::Geometry<f64>> for Geometry {
    type Error = TileError;

    fn try_from(g: geo::Geometry<f64>) -> Result<Self, Self::Error> {
        match g {
            geo::Geometry::Point(p) => Ok(Geometry::Point(p)),
            geo::Geometry::Polygon(p) => Ok(Geometry::Polygon(p)),
            geo::Geometry::MultiPolygon(mp) => Ok(Geometry::MultiPolygon(mp)),
            geo::Geometry::Rect(r) => Ok(Geometry::Polygon(r.to_polygon())),
            geo::Geometry::Triangle(t) => Ok(Geometry::Polygon(t.to_polygon())),
            other => Err(TileError::InvalidGeometry(format!(
                "expected a Point, Polygon or MultiPolygon, got {}",
                geometry_type_name(&other)
            ))),
        }
    }
}

fn geometry_type_name(g: &geo::Geometry<f64>) -> &'static str {
    match g {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}

impl TryFrom<geojson::Geometry> for Geometry {
    type Error = TileError;

    fn try_from(g: geojson::Geometry) -> Result<Self, Self::Error> {
        let g: geo::Geometry<f64> = g
            .try_into()
            .map_err(|e: geojson::Error| TileError::InvalidGeometry(e.to_string()))?;
        Geometry::try_from(g)
    }
}

impl TryFrom<geojson::Feature> for Geometry {
    type Error = TileError;

    fn try_from(feature: geojson::Feature) -> Result<Self, Self::Error> {
        let geometry = feature
            .geometry
            .ok_or_else(|| TileError::InvalidGeometry("feature has no geometry".into()))?;
        Geometry::try_from(geometry)
    }
}

/// A FeatureCollection becomes the union of its features: the single
/// geometry if there is one, otherwise a MultiPolygon of every polygon.
impl TryFrom<GeoJson> for Geometry {
    type Error = TileError;

    fn try_from(geojson: GeoJson) -> Result<Self, Self::Error> {
        match geojson {
            GeoJson::Geometry(g) => Geometry::try_from(g),
            GeoJson::Feature(f) => Geometry::try_from(f),
            GeoJson::FeatureCollection(fc) => {
                let mut parts = fc
                    .features
                    .into_iter()
                    .map(Geometry::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                if parts.len() == 1 {
                    return Ok(parts.remove(0));
                }
                let mut polygons = Vec::new();
                for part in parts {
                    match part {
                        Geometry::Polygon(p) => polygons.push(p),
                        Geometry::MultiPolygon(mp) => polygons.extend(mp.0),
                        Geometry::Point(_) => {
                            return Err(TileError::InvalidGeometry(
                                "feature collections must contain only polygons".into(),
                            ))
                        }
                    }
                }
                Ok(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
            }
        }
    }
}

impl FromStr for Geometry {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let geojson: GeoJson = s
            .parse()
            .map_err(|e: geojson::Error| TileError::InvalidGeometry(e.to_string()))?;
        Geometry::try_from(geojson)
    }
}

impl GeoInterface for Geometry {
    fn geo_interface(&self) -> Result<GeoJson, TileError> {
        Ok(GeoJson::Geometry(self.to_geojson()))
    }
}

impl GeoInterface for GeoJson {
    fn geo_interface(&self) -> Result<GeoJson, TileError> {
        Ok(self.clone())
    }
}

impl GeoInterface for geojson::Feature {
    fn geo_interface(&self) -> Result<GeoJson, TileError> {
        Ok(GeoJson::Feature(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Hemisphere;
    use geo::{point, polygon};

    #[test]
    fn test_parse_feature_and_collection() {
        let feature = r#"{"type": "Feature", "properties": null, "geometry": {
            "type": "Polygon",
            "coordinates": [[[-122.51, 37.77], [-122.45, 37.77], [-122.45, 37.76], [-122.51, 37.76], [-122.51, 37.77]]]
        }}"#;
        assert!(matches!(feature.parse::<Geometry>().unwrap(), Geometry::Polygon(_)));

        let collection = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}, "geometry": {"type": "Polygon",
              "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
            {"type": "Feature", "properties": {}, "geometry": {"type": "Polygon",
              "coordinates": [[[2, 0], [3, 0], [3, 1], [2, 0]]]}}
        ]}"#;
        match collection.parse::<Geometry>().unwrap() {
            Geometry::MultiPolygon(mp) => assert_eq!(mp.0.len(), 2),
            other => panic!("expected MultiPolygon, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_polygonal() {
        let line = r#"{"type": "LineString", "coordinates": [[0, 0], [1, 1]]}"#;
        assert!(matches!(
            line.parse::<Geometry>(),
            Err(TileError::InvalidGeometry(_))
        ));
        assert!("not json".parse::<Geometry>().is_err());
    }

    #[test]
    fn test_validate() {
        let ok: Geometry = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)].into();
        assert!(ok.validate().is_ok());

        let bad_lat: Geometry = point!(x: 0.0, y: 95.0).into();
        assert!(matches!(bad_lat.validate(), Err(TileError::InvalidGeometry(_))));

        let nan: Geometry = point!(x: f64::NAN, y: 0.0).into();
        assert!(matches!(nan.validate(), Err(TileError::InvalidGeometry(_))));

        let empty = Geometry::MultiPolygon(MultiPolygon::new(vec![]));
        assert!(matches!(empty.validate(), Err(TileError::InvalidGeometry(_))));
    }

    #[test]
    fn test_antimeridian_centroid() {
        let g: Geometry = polygon![
            (x: 179.0, y: -17.0),
            (x: -179.0, y: -17.0),
            (x: -179.0, y: -16.0),
            (x: 179.0, y: -16.0),
        ]
        .into();
        assert!(g.crosses_antimeridian());
        let (lon, lat) = g.centroid().unwrap();
        assert!((lon.abs() - 180.0).abs() < 1e-9, "lon = {lon}");
        assert!((lat + 16.5).abs() < 1e-9);
        assert!((g.area_deg2() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_densifies_and_classifies() {
        let zone = UtmZone::new(15, Hemisphere::North).unwrap();
        let square: Geometry = polygon![
            (x: -94.0, y: 44.0),
            (x: -92.0, y: 44.0),
            (x: -92.0, y: 45.0),
            (x: -94.0, y: 45.0),
        ]
        .into();
        let footprint = square.project(&zone).unwrap();
        assert_eq!(footprint.areas.len(), 1);
        // 2° edges densified at 0.1°
        assert!(footprint.areas[0].exterior().0.len() > 40);

        let collapsed: Geometry = polygon![
            (x: -93.0, y: 44.0),
            (x: -93.0, y: 44.0),
            (x: -93.0, y: 44.0),
        ]
        .into();
        let footprint = collapsed.project(&zone).unwrap();
        assert!(footprint.areas.is_empty());
        assert_eq!(footprint.points.len(), 1);

        let sliver: Geometry = polygon![
            (x: -93.0, y: 44.0),
            (x: -93.0, y: 44.5),
            (x: -93.0, y: 44.0),
        ]
        .into();
        let footprint = sliver.project(&zone).unwrap();
        assert_eq!(footprint.lines.len(), 1);
    }

    #[test]
    fn test_project_outside_zone_reach() {
        let zone = UtmZone::new(15, Hemisphere::North).unwrap();
        let far: Geometry = point!(x: 90.0, y: 10.0).into();
        assert!(matches!(far.project(&zone), Err(TileError::InvalidGeometry(_))));
    }
}
