use thiserror::Error;
use validator::ValidationErrors;

/// Fatal errors of the simulation core.
///
/// Configuration problems are reported before any numeric work starts.
/// Export failures never surface here; they are reported through the
/// progress sink and the failing sink is dropped.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationErrors),

    #[error("invalid lattice size {0}, expected >= 1")]
    LatticeSize(usize),

    #[error("degenerate lattice basis: {0}")]
    DegenerateBasis(&'static str),

    #[error("asymptotic coupling fit needs at least two distinct radii, got {0}")]
    InsufficientRadii(usize),

    #[error("interrupted")]
    Interrupted,
}
