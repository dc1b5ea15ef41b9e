pub mod basis;
pub mod lattice;

pub use basis::{square, triangular, Basis};
pub use lattice::Lattice;

use nalgebra::{Matrix3, Vector3};

/// Single-precision 3-vector used for positions, directions and fields.
pub type Vec3 = Vector3<f32>;
/// Single-precision 3×3 dyadic used for stored couplings.
pub type Mat3 = Matrix3<f32>;
/// Double-precision dyadic used while accumulating lattice sums.
pub type Mat3d = Matrix3<f64>;
