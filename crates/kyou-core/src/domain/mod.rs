//! Domain layer - entities and pure rules.
//!
//! Nothing in here performs I/O. State transitions, rank arithmetic and the
//! error taxonomy live in this layer; the services in `crate::app` drive
//! them against the ports.

pub mod completion;
pub mod errors;
pub mod ids;
pub mod ordering;
pub mod phase;
pub mod rank;
pub mod task;

pub use completion::CompletionRecord;
pub use errors::{EngineError, ErrorKind, StoreError};
pub use ids::{CategoryId, CompletionId, TaskId, UserId};
pub use ordering::{ListKind, PoolRanks, bottom_of, redistribute, top_of};
pub use phase::{CompletionStatus, TaskList, TaskPhase};
pub use rank::Rank;
pub use task::Task;
