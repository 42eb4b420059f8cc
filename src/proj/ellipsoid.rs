/// Reference ellipsoid, described by its semi-major axis and flattening.
///
/// Derived quantities are computed on demand; they are cheap and only
/// needed when a projection is constructed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (metres)
    pub a: f64,
    /// Flattening
    pub f: f64,
}

impl Ellipsoid {
    pub const fn new(a: f64, f: f64) -> Self {
        Self { a, f }
    }

    /// Third flattening `n = f / (2 - f)`.
    pub fn third_flattening(&self) -> f64 {
        self.f / (2.0 - self.f)
    }

    /// First eccentricity squared `e² = 2f - f²`.
    pub fn e2(&self) -> f64 {
        2.0 * self.f - self.f * self.f
    }

    pub fn eccentricity(&self) -> f64 {
        self.e2().sqrt()
    }

    /// Rectifying radius `A`: the meridian arc length per radian of
    /// rectifying latitude.
    pub fn rectifying_radius(&self) -> f64 {
        let n = self.third_flattening();
        let n2 = n * n;
        self.a / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0)
    }
}

pub const WGS84: Ellipsoid = Ellipsoid::new(6_378_137.0, 1.0 / 298.257_223_563);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wgs84_derived() {
        assert_relative_eq!(WGS84.eccentricity(), 0.081_819_190_842_622, epsilon = 1e-12);
        assert_relative_eq!(WGS84.third_flattening(), 0.001_679_220_386_383_705, epsilon = 1e-12);
    }

    #[test]
    fn test_rectifying_radius() {
        // A * pi/2 is the quarter meridian, ~10_001_965.729 m on WGS84
        let quarter = WGS84.rectifying_radius() * std::f64::consts::FRAC_PI_2;
        assert_relative_eq!(quarter, 10_001_965.729, epsilon = 0.01);
    }
}
