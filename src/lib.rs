//! File-backed collaborators of the `rbm` binary: the cached `J(∞)`
//! artifact, JSON-lines result/snapshot export and terminal progress.

pub mod artifact;
pub mod export;
pub mod progress;

pub use artifact::CsvArtifact;
pub use export::{write_summary, JsonLinesResults, JsonLinesSnapshots};
pub use progress::BarProgress;
