//! UTM zone selection for tiling.
//!
//! Every tile lives in exactly one UTM zone. The zone is chosen from a point
//! (or a geometry's centroid); the hemisphere picks the false northing. Both
//! hemispheres share the same ground grid because the tile grid is anchored
//! at the zone's natural origin (central meridian, equator).

use std::fmt;
use std::str::FromStr;

use crate::error::TileError;
use crate::geometry::Geometry;

/// Latitudes beyond this (in degrees) are rejected by the resolver.
pub const MAX_LATITUDE: f64 = 80.0;

/// Width of a UTM zone in degrees of longitude.
pub const ZONE_WIDTH: f64 = 6.0;

pub const FALSE_EASTING: f64 = 500_000.0;
pub const SOUTH_FALSE_NORTHING: f64 = 10_000_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    pub fn from_lat(lat: f64) -> Self {
        if lat >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        }
    }
}

/// A WGS84 UTM zone: zone number 1..=60 plus hemisphere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UtmZone {
    number: u8,
    hemisphere: Hemisphere,
}

/// Wrap a longitude in degrees into [-180, 180).
pub fn normalize_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

impl UtmZone {
    pub fn new(number: u8, hemisphere: Hemisphere) -> Result<Self, TileError> {
        if !(1..=60).contains(&number) {
            return Err(TileError::InvalidParameter(format!(
                "UTM zone must be between 1 and 60, got {number}"
            )));
        }
        Ok(Self { number, hemisphere })
    }

    /// Zone number of a longitude; 180° wraps to zone 1.
    pub fn number_for_lon(lon: f64) -> u8 {
        let zone = ((normalize_lon(lon) + 180.0) / ZONE_WIDTH).floor() as u8 + 1;
        // rounding at -180 + 360 - ε can land on 61
        zone.min(60)
    }

    /// Resolve the zone for a single lon/lat point.
    pub fn from_lonlat(lon: f64, lat: f64) -> Result<Self, TileError> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(TileError::InvalidGeometry(format!(
                "non-finite coordinate ({lon}, {lat})"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(TileError::InvalidGeometry(format!(
                "({lon}, {lat}) is not a WGS84 longitude/latitude"
            )));
        }
        if lat.abs() > MAX_LATITUDE {
            return Err(TileError::UnsupportedLatitude {
                lat,
                limit: MAX_LATITUDE,
            });
        }
        Ok(Self {
            number: Self::number_for_lon(lon),
            hemisphere: Hemisphere::from_lat(lat),
        })
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    /// Longitude of the zone's central meridian, in degrees.
    pub fn central_meridian(&self) -> f64 {
        f64::from(self.number) * ZONE_WIDTH - 183.0
    }

    /// Western and eastern longitude limits of the zone.
    pub fn lon_range(&self) -> (f64, f64) {
        let cm = self.central_meridian();
        (cm - ZONE_WIDTH / 2.0, cm + ZONE_WIDTH / 2.0)
    }

    pub fn false_easting(&self) -> f64 {
        FALSE_EASTING
    }

    pub fn false_northing(&self) -> f64 {
        match self.hemisphere {
            Hemisphere::North => 0.0,
            Hemisphere::South => SOUTH_FALSE_NORTHING,
        }
    }

    pub fn epsg(&self) -> u32 {
        let base = match self.hemisphere {
            Hemisphere::North => 32600,
            Hemisphere::South => 32700,
        };
        base + u32::from(self.number)
    }

    /// `EPSG:326zz` / `EPSG:327zz`.
    pub fn cs_code(&self) -> String {
        format!("EPSG:{}", self.epsg())
    }

    pub fn proj4(&self) -> String {
        let south = match self.hemisphere {
            Hemisphere::North => "",
            Hemisphere::South => " +south",
        };
        format!(
            "+proj=utm +zone={}{south} +datum=WGS84 +units=m +no_defs",
            self.number
        )
    }

    pub fn wkt(&self) -> String {
        let letter = match self.hemisphere {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
        };
        format!(
            concat!(
                r#"PROJCS["WGS 84 / UTM zone {zone}{letter}","#,
                r#"GEOGCS["WGS 84",DATUM["WGS_1984","#,
                r#"SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],"#,
                r#"AUTHORITY["EPSG","6326"]],"#,
                r#"PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],"#,
                r#"UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],"#,
                r#"AUTHORITY["EPSG","4326"]],"#,
                r#"PROJECTION["Transverse_Mercator"],"#,
                r#"PARAMETER["latitude_of_origin",0],"#,
                r#"PARAMETER["central_meridian",{cm}],"#,
                r#"PARAMETER["scale_factor",0.9996],"#,
                r#"PARAMETER["false_easting",500000],"#,
                r#"PARAMETER["false_northing",{fn_}],"#,
                r#"UNIT["metre",1,AUTHORITY["EPSG","9001"]],"#,
                r#"AXIS["Easting",EAST],AXIS["Northing",NORTH],"#,
                r#"AUTHORITY["EPSG","{epsg}"]]"#,
            ),
            zone = self.number,
            letter = letter,
            cm = self.central_meridian(),
            fn_ = self.false_northing(),
            epsg = self.epsg(),
        )
    }
}

/// Zone designator used inside tile keys: `15` for 15N, `15S` for 15S.
impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hemisphere {
            Hemisphere::North => write!(f, "{:02}", self.number),
            Hemisphere::South => write!(f, "{:02}S", self.number),
        }
    }
}

impl FromStr for UtmZone {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, hemisphere) = match s.as_bytes().last() {
            Some(b'S' | b's') => (&s[..s.len() - 1], Hemisphere::South),
            Some(b'N' | b'n') => (&s[..s.len() - 1], Hemisphere::North),
            _ => (s, Hemisphere::North),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TileError::InvalidParameter(format!(
                "invalid UTM zone designator {s:?}"
            )));
        }
        let number: u8 = digits.parse().map_err(|_| {
            TileError::InvalidParameter(format!("invalid UTM zone designator {s:?}"))
        })?;
        UtmZone::new(number, hemisphere)
    }
}

/// Pick the tiling CRS for a geometry: the zone of its centroid.
///
/// Geometries spanning several zones are still tiled in this one zone.
pub fn resolve_crs(geometry: &Geometry) -> Result<UtmZone, TileError> {
    geometry.validate()?;
    let (lon, lat) = geometry.centroid()?;
    let zone = UtmZone::from_lonlat(lon, lat)?;
    tracing::debug!(lon, lat, zone = %zone, "resolved tiling CRS");
    Ok(zone)
}
