//! Ports - seams between the services and the outside world.
//!
//! Each port is a trait the application layer depends on; adapters live in
//! `crate::impls` (in-memory) or in downstream crates (relational store,
//! Redis). Tests swap in fakes through the same seams.

pub mod clock;
pub mod id_generator;
pub mod lock_store;
pub mod task_store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use id_generator::{IdGenerator, UlidGenerator};
pub use lock_store::{LockStore, LockStoreError, LockToken};
pub use task_store::{StoreWrite, TaskStore};
