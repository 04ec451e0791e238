//! Shared concurrency primitives used by every stage crate (spec C13,
//! §4.13): a bounded batch iterator, a cooperative cancellation flag, and a
//! generic checkpointed for-each loop.

pub mod batch;
pub mod cancellation;
pub mod checkpoint;

pub use batch::batches;
pub use cancellation::CancellationFlag;
pub use checkpoint::CheckpointedLoop;
