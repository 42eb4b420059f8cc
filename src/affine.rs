use crate::error::TileError;

/// A 2D affine transform from pixel space to projected space.
///
/// Pixel edge coordinates (col, row) map to metres as
///   x = a * col + b * row + c
///   y = d * col + e * row + f
/// so `(0, 0)` is the upper-left corner of the upper-left pixel. Tiles only
/// ever produce north-up transforms, where `b = d = 0` and `e = -a`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up grid with square pixels whose upper-left corner is at
    /// (left, top).
    pub fn north_up(left: f64, top: f64, resolution: f64) -> Self {
        Self::new(resolution, 0.0, left, 0.0, -resolution, top)
    }

    /// GDAL geotransform order `[c, a, b, f, d, e]`.
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// (col, row) -> (x, y)
    pub fn forward(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.a * col + self.b * row + self.c;
        let y = self.d * col + self.e * row + self.f;
        (x, y)
    }

    pub fn inverse(&self) -> Result<Affine, TileError> {
        let det = self.a * self.e - self.b * self.d;
        if det.abs() < f64::EPSILON {
            return Err(TileError::Affine(
                "singular affine transform (determinant is zero)".into(),
            ));
        }
        let inv_det = 1.0 / det;
        Ok(Affine {
            a: self.e * inv_det,
            b: -self.b * inv_det,
            c: (self.b * self.f - self.e * self.c) * inv_det,
            d: -self.d * inv_det,
            e: self.a * inv_det,
            f: (self.d * self.c - self.a * self.f) * inv_det,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_north_up_tile_corners() {
        // 2048 px of 30 m with the top-left corner of tile 15:3:80
        let aff = Affine::north_up(684_320.0, 4_976_640.0, 30.0);
        let (x, y) = aff.forward(0.0, 0.0);
        assert_relative_eq!(x, 684_320.0);
        assert_relative_eq!(y, 4_976_640.0);

        let (x, y) = aff.forward(2048.0, 2048.0);
        assert_relative_eq!(x, 745_760.0);
        assert_relative_eq!(y, 4_915_200.0);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let aff = Affine::north_up(684_320.0, 4_976_640.0, 30.0);
        let inv = aff.inverse().unwrap();
        let (col, row) = inv.forward(684_335.0, 4_976_625.0);
        assert_relative_eq!(col, 0.5, epsilon = 1e-9);
        assert_relative_eq!(row, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_singular_affine() {
        let aff = Affine::north_up(0.0, 0.0, 0.0);
        assert!(matches!(aff.inverse(), Err(TileError::Affine(_))));
    }

    #[test]
    fn test_gdal_layout() {
        let aff = Affine::north_up(500_000.0, 6_000_000.0, 10.0);
        assert_eq!(aff.to_gdal(), [500_000.0, 10.0, 0.0, 6_000_000.0, 0.0, -10.0]);
    }
}
