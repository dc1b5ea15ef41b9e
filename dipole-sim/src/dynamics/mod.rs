pub mod field;
pub mod integrator;

pub use field::{effective_field, magnetic_energy, mean_direction};
pub use integrator::step;
