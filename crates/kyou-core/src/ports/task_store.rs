//! TaskStore port - the durable store seam.
//!
//! The engine computes every transition in memory against a fresh read and
//! then hands the store one write-set per operation. `apply` must commit
//! that set atomically: in the production relational adapter it maps to a
//! single transaction, in the in-memory adapter to a single lock guard.
//! Rank decisions are never cached across calls, and the engine holds a
//! per-owner gate from read to commit, so a store sees one owner's
//! write-sets in sequence; no commit may be half-applied.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{CompletionId, CompletionRecord, StoreError, Task, TaskId, UserId};

/// One durable mutation inside an atomic write-set.
#[derive(Debug, Clone)]
pub enum StoreWrite {
    /// Insert or replace the whole task row.
    Task(Task),
    /// Append a completion record.
    PutCompletion(CompletionRecord),
    /// Remove one completion record. The engine names the exact record;
    /// older completions of the same task are history and stay.
    DeleteCompletion(CompletionId),
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, task_id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Every task belonging to `owner`, in no particular order.
    async fn tasks_of(&self, owner: UserId) -> Result<Vec<Task>, StoreError>;

    /// Tasks still sitting in a today list whose active date is before
    /// `date`, across all owners. These are the close-out candidates; the
    /// date guard is what makes a re-run of the batch a no-op.
    async fn today_older_than(&self, date: NaiveDate) -> Result<Vec<Task>, StoreError>;

    /// Backlog tasks whose deadline is exactly `date`, across all owners.
    async fn due_backlog(&self, date: NaiveDate) -> Result<Vec<Task>, StoreError>;

    async fn completions_for_task(
        &self,
        task_id: TaskId,
    ) -> Result<Vec<CompletionRecord>, StoreError>;

    /// Completion records of one owner's tasks within `[from, to)`.
    async fn completions_between(
        &self,
        owner: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CompletionRecord>, StoreError>;

    /// Commit the whole write-set atomically, or nothing at all.
    async fn apply(&self, writes: Vec<StoreWrite>) -> Result<(), StoreError>;
}
