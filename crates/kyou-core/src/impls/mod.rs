//! Default in-memory adapters.
//!
//! Good enough for development, demos and tests. Durable adapters
//! (relational store, Redis lock store) implement the same ports in their
//! own crates.

pub mod inmem_lock_store;
pub mod inmem_task_store;

pub use inmem_lock_store::InMemoryLockStore;
pub use inmem_task_store::InMemoryTaskStore;
