//! Task - the tracked entity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CategoryId, TaskId, UserId};
use super::phase::TaskPhase;
use super::rank::Rank;

/// One tracked task.
///
/// `phase` is the single source of truth for list membership, completion
/// and ordering. The flags around it (`bookmarked`, `repeating`, `deadline`)
/// influence rollover and display but never the phase machine directly.
///
/// Phase changes go through [`Task::transition`] so the new phase and the
/// `updated_at` stamp land together; which transitions are legal from which
/// phase is the engine's call, not this record's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub owner_id: UserId,
    /// Optional grouping label. Referential integrity lives with the store.
    pub category_id: Option<CategoryId>,
    pub content: String,
    /// Due date; at rollover of this exact date the task is pulled into the
    /// today list automatically.
    pub deadline: Option<NaiveDate>,
    pub bookmarked: bool,
    /// Repeating tasks return to the backlog after a completed day instead
    /// of retiring into history.
    pub repeating: bool,
    pub phase: TaskPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A new task starts in the backlog at the given rank.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_id: TaskId,
        owner_id: UserId,
        category_id: Option<CategoryId>,
        content: impl Into<String>,
        deadline: Option<NaiveDate>,
        repeating: bool,
        rank: Rank,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            owner_id,
            category_id,
            content: content.into(),
            deadline,
            bookmarked: false,
            repeating,
            phase: TaskPhase::Backlog { rank },
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the phase and touch the update stamp in one step.
    pub fn transition(&mut self, next: TaskPhase, now: DateTime<Utc>) {
        self.phase = next;
        self.updated_at = now;
    }

    pub fn set_bookmarked(&mut self, bookmarked: bool, now: DateTime<Utc>) {
        self.bookmarked = bookmarked;
        self.updated_at = now;
    }
}
