//! Boundaries between the simulation core and its outer collaborators.
//!
//! The core never formats or writes text itself: block records, snapshots,
//! progress and the cached `J(∞)` value all cross one of these traits.

use thiserror::Error;

use crate::coupling::AsymptoticEstimate;
use crate::geometry::{Basis, Vec3};
use crate::statistics::{BlockRecord, SnapshotRecord};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed artifact: {0}")]
    Malformed(String),
    #[error("artifact was computed for another lattice: {0}")]
    BasisMismatch(String),
}

/// Receives one aggregate record per equilibration block.
pub trait ResultSink {
    fn record(&mut self, record: &BlockRecord) -> Result<(), SinkError>;

    /// Called once when realization `realization` is done.
    fn finish(&mut self, _realization: usize) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Receives full per-site configurations at the snapshot cadence.
pub trait SnapshotSink {
    /// Called once per realization before the first snapshot.
    fn begin(&mut self, realization: usize, positions: &[Vec3]) -> Result<(), SinkError>;

    fn snapshot(&mut self, snapshot: &SnapshotRecord) -> Result<(), SinkError>;

    fn finish(&mut self, _realization: usize) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Per-step status passed to [`ProgressSink::step`].
#[derive(Debug, Clone, Copy)]
pub struct StepStatus {
    pub realization: usize,
    pub step: usize,
    pub time: f64,
    pub lambda: f64,
    pub mean_direction: Vec3,
}

/// Free-form progress and diagnostics. Implementations swallow their own
/// failures; nothing here can abort a run.
pub trait ProgressSink {
    fn message(&self, msg: &str);

    fn step(&self, _status: &StepStatus) {}
}

/// Discards all progress output.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn message(&self, _msg: &str) {}
}

/// Durable cache of the asymptotic coupling scalar `J₁₁(∞)`.
///
/// The value depends on the lattice, so every artifact is keyed by the
/// basis it was estimated for.
pub trait CouplingArtifact {
    /// `Ok(None)` when no artifact exists yet, `Err(BasisMismatch)` when the
    /// stored value belongs to a different basis.
    fn load(&self, basis: &Basis) -> Result<Option<f64>, ArtifactError>;

    /// Persist the scalar, its basis and the per-radius diagnostic series.
    fn store(&self, basis: &Basis, estimate: &AsymptoticEstimate) -> Result<(), ArtifactError>;
}
