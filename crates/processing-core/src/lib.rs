//! Montage Processing Core
//!
//! Background work that must happen one piece at a time:
//! - **Processing queue:** FIFO job runner, at most one job in flight,
//!   with weighted progress reporting and failure isolation

pub mod queue;

pub use queue::{Job, ProcessingQueue, ProgressCallback, QueueStats};
