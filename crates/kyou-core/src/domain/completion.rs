//! CompletionRecord - the append-only completion log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CompletionId, TaskId};

/// One completion of a task.
///
/// Written when a task is marked done, removed when the mark is undone.
/// The log drives two things: the ordering of the finished section of the
/// today screen (ascending `completed_at`) and the calendar history. A
/// repeat task accumulates one record per completed day; the older ones
/// are permanent history.
///
/// While a task is in a completed phase, exactly one record written since
/// its active day began must exist; the record may be stamped past the
/// day's end when the toggle came after local midnight. Zero or several in
/// that span is corruption from an earlier bug or a manual edit, and the
/// engine refuses to guess which record to keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub completion_id: CompletionId,
    pub task_id: TaskId,
    /// When the task was finished. For after-the-fact completions this is
    /// back-dated to the evening of the day the task was active on.
    pub completed_at: DateTime<Utc>,
}

impl CompletionRecord {
    pub fn new(completion_id: CompletionId, task_id: TaskId, completed_at: DateTime<Utc>) -> Self {
        Self {
            completion_id,
            task_id,
            completed_at,
        }
    }
}
