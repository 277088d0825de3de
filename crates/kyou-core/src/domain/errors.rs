//! Engine errors - one taxonomy with an operator-facing classification.

use thiserror::Error;

use super::ids::{TaskId, UserId};
use super::ordering::ListKind;

/// Coarse classification used for logging and alerting decisions.
///
/// - `NotFound` / `InvalidTransition`: caller mistakes; reject and move on.
/// - `DataIntegrity`: an earlier bug or a manual edit left the store in a
///   shape the rules forbid. Surface loudly, never repair silently.
/// - `Storage`: the adapter failed; the operation may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidTransition,
    DataIntegrity,
    Storage,
}

/// Failure raised by a `TaskStore` adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("task {task} does not belong to {owner}")]
    ForeignTask { task: TaskId, owner: UserId },

    #[error("task is already completed: {0}")]
    AlreadyCompleted(TaskId),

    #[error("cannot complete a backlog task: {0}")]
    CannotCompleteBacklog(TaskId),

    #[error("cannot swipe a yesterday task: {0}")]
    CannotSwipeYesterday(TaskId),

    #[error("task {task} is not in the {expected:?} pool")]
    NotInList { task: TaskId, expected: ListKind },

    #[error("reorder needs at least two tasks, got {0}")]
    ReorderTooFew(usize),

    #[error("duplicate task in reorder request: {0}")]
    ReorderDuplicate(TaskId),

    #[error("no completion record for completed task {0}")]
    CompletionRecordMissing(TaskId),

    #[error("expected one completion record for task {task}, found {found}")]
    CompletionRecordDuplicated { task: TaskId, found: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::ForeignTask { .. }
            | EngineError::AlreadyCompleted(_)
            | EngineError::CannotCompleteBacklog(_)
            | EngineError::CannotSwipeYesterday(_)
            | EngineError::NotInList { .. }
            | EngineError::ReorderTooFew(_)
            | EngineError::ReorderDuplicate(_) => ErrorKind::InvalidTransition,
            EngineError::CompletionRecordMissing(_)
            | EngineError::CompletionRecordDuplicated { .. } => ErrorKind::DataIntegrity,
            EngineError::Store(_) => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn kinds_classify_each_variant() {
        let task: TaskId = Ulid::new().into();

        assert_eq!(EngineError::NotFound(task).kind(), ErrorKind::NotFound);
        assert_eq!(
            EngineError::AlreadyCompleted(task).kind(),
            ErrorKind::InvalidTransition
        );
        assert_eq!(
            EngineError::CompletionRecordMissing(task).kind(),
            ErrorKind::DataIntegrity
        );
        assert_eq!(
            EngineError::Store(StoreError::Backend("down".into())).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn messages_name_the_offending_task() {
        let task: TaskId = Ulid::new().into();

        let message = EngineError::CannotCompleteBacklog(task).to_string();

        assert!(message.contains("task-"));
    }
}
