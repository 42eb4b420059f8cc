pub mod ellipsoid;
pub mod transverse_mercator;

use crate::error::ProjError;

/// Trait for map projections supporting forward and inverse transforms.
///
/// Geographic coordinates are in radians, projected coordinates in metres.
pub trait Projection: Send + Sync {
    /// Forward: (lon_rad, lat_rad) -> (easting, northing)
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError>;

    /// Inverse: (easting, northing) -> (lon_rad, lat_rad)
    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError>;

    /// Forward transform taking and returning degrees-based lon/lat input.
    fn forward_deg(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        self.forward(lon.to_radians(), lat.to_radians())
    }

    /// Inverse transform returning (lon, lat) in degrees.
    fn inverse_deg(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        let (lon, lat) = self.inverse(x, y)?;
        Ok((lon.to_degrees(), lat.to_degrees()))
    }
}
