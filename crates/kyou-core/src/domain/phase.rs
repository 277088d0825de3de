//! TaskPhase - list membership, completion and ordering as one closed type.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::rank::Rank;

/// The three lists a task can sit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskList {
    Backlog,
    Today,
    Yesterday,
}

/// Completion marker, defined only for tasks in the today/yesterday lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Incomplete,
    Completed,
}

/// Where a task currently lives.
///
/// 状態・完了・順位を一つのタグ付き型に畳み込む。An earlier cut of this
/// model spread the same information over four nullable columns (list,
/// completion status, two rank fields), which let rows exist that the
/// rules forbid. Here a completed task cannot carry a rank and a backlog
/// task cannot carry a completion status, structurally.
///
/// Transitions (all driven by the engine and the rollover batch):
/// - `Backlog -> Today`: swipe in, or deadline promotion at rollover
/// - `Today -> Backlog`: swipe out
/// - `Today <-> TodayDone`: completion toggle
/// - `Today -> Yesterday`: rollover close-out of an unfinished day
/// - `Yesterday <-> YesterdayDone`: after-the-fact completion toggle
/// - `TodayDone -> Backlog`: rollover re-queue of repeating tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskPhase {
    /// Waiting in the backlog pool.
    Backlog { rank: Rank },
    /// Picked for the day `on`, not finished yet. Ranked in the today pool.
    Today { on: NaiveDate, rank: Rank },
    /// Finished while on the day `on`. Unranked; a completion record exists.
    TodayDone { on: NaiveDate },
    /// Unfinished carry-over from the day `on`. Ranked in the backlog pool.
    Yesterday { on: NaiveDate, rank: Rank },
    /// Carry-over marked done after the fact. Unranked; a completion record
    /// exists, back-dated to the evening of `on`.
    YesterdayDone { on: NaiveDate },
}

impl TaskPhase {
    /// Which list the task renders in.
    pub fn list(&self) -> TaskList {
        match self {
            TaskPhase::Backlog { .. } => TaskList::Backlog,
            TaskPhase::Today { .. } | TaskPhase::TodayDone { .. } => TaskList::Today,
            TaskPhase::Yesterday { .. } | TaskPhase::YesterdayDone { .. } => TaskList::Yesterday,
        }
    }

    /// Completion status, when the list has one. Backlog tasks have none.
    pub fn completion(&self) -> Option<CompletionStatus> {
        match self {
            TaskPhase::Backlog { .. } => None,
            TaskPhase::Today { .. } | TaskPhase::Yesterday { .. } => {
                Some(CompletionStatus::Incomplete)
            }
            TaskPhase::TodayDone { .. } | TaskPhase::YesterdayDone { .. } => {
                Some(CompletionStatus::Completed)
            }
        }
    }

    /// Rank in the today pool, if the task occupies it.
    pub fn today_rank(&self) -> Option<Rank> {
        match self {
            TaskPhase::Today { rank, .. } => Some(*rank),
            _ => None,
        }
    }

    /// Rank in the backlog pool, if the task occupies it. Unfinished
    /// carry-overs share this pool with backlog tasks.
    pub fn backlog_rank(&self) -> Option<Rank> {
        match self {
            TaskPhase::Backlog { rank } | TaskPhase::Yesterday { rank, .. } => Some(*rank),
            _ => None,
        }
    }

    /// The day this task was (or is) active on. None while in the backlog.
    pub fn active_date(&self) -> Option<NaiveDate> {
        match self {
            TaskPhase::Backlog { .. } => None,
            TaskPhase::Today { on, .. }
            | TaskPhase::TodayDone { on }
            | TaskPhase::Yesterday { on, .. }
            | TaskPhase::YesterdayDone { on } => Some(*on),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            TaskPhase::TodayDone { .. } | TaskPhase::YesterdayDone { .. }
        )
    }

    /// Same variant with the rank replaced. Unranked variants come back
    /// unchanged; callers vet rank membership before reordering.
    pub fn reranked(self, rank: Rank) -> TaskPhase {
        match self {
            TaskPhase::Backlog { .. } => TaskPhase::Backlog { rank },
            TaskPhase::Today { on, .. } => TaskPhase::Today { on, rank },
            TaskPhase::Yesterday { on, .. } => TaskPhase::Yesterday { on, rank },
            done => done,
        }
    }
}
