//! Application services.
//!
//! - [`engine::TaskOrderingEngine`]: user-initiated transitions and ranks
//! - [`rollover::RolloverBatchProcessor`]: the midnight close-out/promote batch
//! - [`scheduler::RolloverScheduler`]: fires the batch once a day
//! - [`lock::DistributedLock`]: keyed mutual exclusion across processes

pub mod engine;
pub mod lock;
pub mod rollover;
pub mod scheduler;

pub use engine::{CompletedEntry, TaskOrderingEngine, TodayView, YesterdayView};
pub use lock::{DistributedLock, ExclusiveError, LockError};
pub use rollover::{RolloverBatchProcessor, RolloverConfig, RolloverReport};
pub use scheduler::{RolloverScheduler, Schedule};
