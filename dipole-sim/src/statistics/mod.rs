pub mod binder;
pub mod results;

pub use binder::BinderCumulant;
pub use results::{BlockAggregate, BlockRecord, BlockSummary, SnapshotRecord};
