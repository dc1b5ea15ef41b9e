use super::Vec3;
use crate::error::SimError;

/// Squared-length / squared-area floor below which a basis is degenerate.
const DEGENERATE_EPS: f32 = 1e-10;

/// The two in-plane primitive vectors of a periodic Bravais lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub a: Vec3,
    pub b: Vec3,
}

impl Basis {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { a, b }
    }

    /// Area of the primitive cell, `|a × b|`.
    pub fn cell_area(&self) -> f32 {
        self.a.cross(&self.b).norm()
    }

    /// Lattice point `i·a + j·b`.
    #[inline]
    pub fn point(&self, i: i64, j: i64) -> Vec3 {
        self.a * i as f32 + self.b * j as f32
    }

    /// Reject zero-length or parallel basis vectors.
    pub fn check(&self) -> Result<(), SimError> {
        if self.a.norm_squared() < DEGENERATE_EPS || self.b.norm_squared() < DEGENERATE_EPS {
            return Err(SimError::DegenerateBasis("zero-length basis vector"));
        }
        let area2 = self.a.cross(&self.b).norm_squared();
        if area2 < DEGENERATE_EPS * self.a.norm_squared() * self.b.norm_squared() {
            return Err(SimError::DegenerateBasis("parallel basis vectors"));
        }
        Ok(())
    }

    /// Half-widths `(wi, wj)` of the index window that contains every lattice
    /// point of norm `<= radius`.
    ///
    /// A point `i·a + j·b` lies at distance `|i|·area/|b|` from the line
    /// spanned by `b`, hence `|i| <= radius·|b|/area` (and symmetrically for `j`).
    pub fn window(&self, radius: f64) -> (i64, i64) {
        let area = self.cell_area() as f64;
        let wi = (radius * self.b.norm() as f64 / area).ceil() as i64;
        let wj = (radius * self.a.norm() as f64 / area).ceil() as i64;
        (wi, wj)
    }
}

/// Triangular lattice basis: `a = (1, 0, 0)`, `b = (1/2, √3/2, 0)`.
///
/// Nearest-neighbor distance 1, coordination number 6.
pub fn triangular() -> Basis {
    Basis::new(
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.5, 0.5 * 3.0f32.sqrt(), 0.0),
    )
}

/// Square lattice basis: `a = (1, 0, 0)`, `b = (0, 1, 0)`.
pub fn square() -> Basis {
    Basis::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0))
}
