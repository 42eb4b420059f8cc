//! Transverse Mercator projection using the 6th-order Krüger n-series.
//!
//! Karney (2011) formulation with 6th-order α/β coefficients, accurate to
//! well below a millimetre within a few thousand kilometres of the central
//! meridian. Every tile CRS in this crate is a UTM zone built on top of it.

use crate::crs::UtmZone;
use crate::error::ProjError;
use crate::proj::ellipsoid::{Ellipsoid, WGS84};
use crate::proj::Projection;

/// UTM central scale factor.
pub const UTM_SCALE_FACTOR: f64 = 0.9996;

/// Longitude offsets from the central meridian at or beyond this many
/// radians have no finite transverse Mercator image.
const MAX_DLAM: f64 = std::f64::consts::FRAC_PI_2 - 1e-9;

#[derive(Clone, Debug)]
pub struct TransverseMercator {
    ellipsoid: Ellipsoid,
    lon0: f64,
    k0: f64,
    false_easting: f64,
    false_northing: f64,
    // k0 * A, the scale applied to the conformal (ξ, η) plane
    scale: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
}

impl TransverseMercator {
    /// Build a projection with its natural origin on the equator.
    pub fn new(
        ellipsoid: Ellipsoid,
        lon0: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let n = ellipsoid.third_flattening();
        Self {
            ellipsoid,
            lon0,
            k0,
            false_easting,
            false_northing,
            scale: k0 * ellipsoid.rectifying_radius(),
            alpha: alpha_coefficients(n),
            beta: beta_coefficients(n),
        }
    }

    /// The WGS84 transverse Mercator for a UTM zone.
    pub fn utm(zone: &UtmZone) -> Self {
        Self::new(
            WGS84,
            zone.central_meridian().to_radians(),
            UTM_SCALE_FACTOR,
            zone.false_easting(),
            zone.false_northing(),
        )
    }

    pub fn central_meridian(&self) -> f64 {
        self.lon0
    }

    pub fn scale_factor(&self) -> f64 {
        self.k0
    }

    /// Convert geodetic tangent τ to conformal tangent τ'.
    fn tau_to_tau_prime(&self, tau: f64) -> f64 {
        let e = self.ellipsoid.eccentricity();
        let tau1 = tau.hypot(1.0);
        let sigma = (e * (e * tau / tau1).atanh()).sinh();
        tau * sigma.hypot(1.0) - sigma * tau1
    }

    /// Recover geodetic tangent τ from conformal tangent τ' (Newton).
    fn tau_prime_to_tau(&self, tau_prime: f64) -> f64 {
        let e = self.ellipsoid.eccentricity();
        let e2 = self.ellipsoid.e2();
        let mut tau = tau_prime;

        for _ in 0..15 {
            let tau1 = tau.hypot(1.0);
            let sigma = (e * (e * tau / tau1).atanh()).sinh();
            let estimate = tau * sigma.hypot(1.0) - sigma * tau1;
            let dtau = (tau_prime - estimate) * (1.0 + (1.0 - e2) * tau * tau)
                / ((1.0 - e2) * tau1 * estimate.hypot(1.0));
            tau += dtau;
            if dtau.abs() < 1e-12 * (1.0 + tau.abs()) {
                break;
            }
        }
        tau
    }
}

/// Forward series coefficients α₁..α₆.
fn alpha_coefficients(n: f64) -> [f64; 6] {
    let n2 = n * n;
    let n3 = n2 * n;
    let n4 = n3 * n;
    let n5 = n4 * n;
    let n6 = n5 * n;
    [
        n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4 - 127.0 / 288.0 * n5
            + 7891.0 / 37800.0 * n6,
        13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4 + 281.0 / 630.0 * n5
            - 1983433.0 / 1935360.0 * n6,
        61.0 / 240.0 * n3 - 103.0 / 140.0 * n4 + 15061.0 / 26880.0 * n5
            + 167603.0 / 181440.0 * n6,
        49561.0 / 161280.0 * n4 - 179.0 / 168.0 * n5 + 6601661.0 / 7257600.0 * n6,
        34729.0 / 80640.0 * n5 - 3418889.0 / 1995840.0 * n6,
        212378941.0 / 319334400.0 * n6,
    ]
}

/// Inverse series coefficients β₁..β₆.
fn beta_coefficients(n: f64) -> [f64; 6] {
    let n2 = n * n;
    let n3 = n2 * n;
    let n4 = n3 * n;
    let n5 = n4 * n;
    let n6 = n5 * n;
    [
        n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4 - 81.0 / 512.0 * n5
            + 96199.0 / 604800.0 * n6,
        1.0 / 48.0 * n2 + 1.0 / 15.0 * n3 - 437.0 / 1440.0 * n4 + 46.0 / 105.0 * n5
            - 1118711.0 / 3870720.0 * n6,
        17.0 / 480.0 * n3 - 37.0 / 840.0 * n4 - 209.0 / 4480.0 * n5 + 5569.0 / 90720.0 * n6,
        4397.0 / 161280.0 * n4 - 11.0 / 504.0 * n5 - 830251.0 / 7257600.0 * n6,
        4583.0 / 161280.0 * n5 - 108847.0 / 3991680.0 * n6,
        20648693.0 / 638668800.0 * n6,
    ]
}

/// Wrap an angle in radians to [-π, π).
fn wrap_pi(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    (angle + PI).rem_euclid(TAU) - PI
}

impl Projection for TransverseMercator {
    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjError> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(ProjError::TransformFailed(format!(
                "non-finite coordinate ({lon}, {lat})"
            )));
        }
        let dlam = wrap_pi(lon - self.lon0);
        if dlam.abs() >= MAX_DLAM {
            return Err(ProjError::TransformFailed(format!(
                "longitude {:.6} is 90 degrees or more from the central meridian {:.6}",
                lon.to_degrees(),
                self.lon0.to_degrees()
            )));
        }

        let tau_prime = self.tau_to_tau_prime(lat.tan());
        let cos_dlam = dlam.cos();

        let xi_prime = tau_prime.atan2(cos_dlam);
        let eta_prime = (dlam.sin() / tau_prime.hypot(cos_dlam)).asinh();

        let mut xi = xi_prime;
        let mut eta = eta_prime;
        for (j, &a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += a * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += a * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }

        Ok((
            self.scale * eta + self.false_easting,
            self.scale * xi + self.false_northing,
        ))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64), ProjError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjError::TransformFailed(format!(
                "non-finite coordinate ({x}, {y})"
            )));
        }
        let eta = (x - self.false_easting) / self.scale;
        let xi = (y - self.false_northing) / self.scale;

        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (j, &b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_prime -= b * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let sinh_eta = eta_prime.sinh();
        let cos_xi = xi_prime.cos();
        let tau_prime = xi_prime.sin() / sinh_eta.hypot(cos_xi);
        let tau = self.tau_prime_to_tau(tau_prime);

        let lat = tau.atan();
        let lon = self.lon0 + sinh_eta.atan2(cos_xi);
        if !lat.is_finite() || !lon.is_finite() {
            return Err(ProjError::TransformFailed(format!(
                "({x}, {y}) has no geographic preimage"
            )));
        }

        Ok((lon, lat))
    }
}
