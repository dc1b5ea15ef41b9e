pub mod asymptotic;
pub mod kernel;
pub mod tensors;

pub use asymptotic::{
    default_radii, estimate, j_infinity, resolve_j_infinity, AsymptoticEstimate, RadiusSample,
};
pub use kernel::coupling;
pub use tensors::CouplingTensors;
