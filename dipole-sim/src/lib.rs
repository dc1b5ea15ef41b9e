//! Stochastic rotational dynamics of a periodic lattice of interacting
//! magnetic dipoles.
//!
//! The coupling tensors of a supercell are precomputed once per
//! [`Simulation`]; each [`Realization`] then integrates the rotational
//! Langevin equation while λ is annealed through the ordering transition,
//! exporting block records to [`ResultSink`]s.

pub mod config;
pub mod coupling;
pub mod dynamics;
pub mod error;
pub mod geometry;
pub mod random;
pub mod schedule;
pub mod simulation;
pub mod sinks;
pub mod statistics;

mod parallel;

pub use config::SimConfig;
pub use coupling::{resolve_j_infinity, AsymptoticEstimate, CouplingTensors};
pub use error::SimError;
pub use geometry::{Basis, Lattice, Vec3};
pub use simulation::{Realization, RunOutcome, Simulation, Sinks};
pub use sinks::{
    ArtifactError, CouplingArtifact, NullProgress, ProgressSink, ResultSink, SinkError,
    SnapshotSink, StepStatus,
};
pub use statistics::{BlockAggregate, BlockRecord, BlockSummary, SnapshotRecord};
