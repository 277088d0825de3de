//! In-memory TaskStore for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{CompletionRecord, StoreError, Task, TaskId, TaskList, UserId};
use crate::ports::{StoreWrite, TaskStore};

struct InMemoryState {
    tasks: HashMap<TaskId, Task>,
    /// Append-only log; `DeleteCompletion` is the only thing that shrinks it.
    completions: Vec<CompletionRecord>,
}

/// In-memory `TaskStore`.
///
/// The production adapter is a relational store where `apply` runs one
/// transaction. Here the whole write-set mutates the state under a single
/// lock guard, which gives the same all-or-nothing visibility.
pub struct InMemoryTaskStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState {
                tasks: HashMap::new(),
                completions: Vec::new(),
            })),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, task_id: TaskId) -> Result<Option<Task>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.tasks.get(&task_id).cloned())
    }

    async fn tasks_of(&self, owner: UserId) -> Result<Vec<Task>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn today_older_than(&self, date: NaiveDate) -> Result<Vec<Task>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.phase.list() == TaskList::Today)
            .filter(|task| task.phase.active_date().map(|on| on < date).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn due_backlog(&self, date: NaiveDate) -> Result<Vec<Task>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.phase.list() == TaskList::Backlog)
            .filter(|task| task.deadline == Some(date))
            .cloned()
            .collect())
    }

    async fn completions_for_task(
        &self,
        task_id: TaskId,
    ) -> Result<Vec<CompletionRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .completions
            .iter()
            .filter(|record| record.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn completions_between(
        &self,
        owner: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CompletionRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .completions
            .iter()
            .filter(|record| record.completed_at >= from && record.completed_at < to)
            .filter(|record| {
                state
                    .tasks
                    .get(&record.task_id)
                    .map(|task| task.owner_id == owner)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn apply(&self, writes: Vec<StoreWrite>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        for write in writes {
            match write {
                StoreWrite::Task(task) => {
                    state.tasks.insert(task.task_id, task);
                }
                StoreWrite::PutCompletion(record) => {
                    state.completions.push(record);
                }
                StoreWrite::DeleteCompletion(completion_id) => {
                    state
                        .completions
                        .retain(|record| record.completion_id != completion_id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Rank, TaskPhase};
    use chrono::TimeZone;
    use ulid::Ulid;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 8, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn backlog_task(owner: UserId, deadline: Option<NaiveDate>) -> Task {
        Task::new(
            Ulid::new().into(),
            owner,
            None,
            "something",
            deadline,
            false,
            Rank::new(1),
            instant(),
        )
    }

    #[tokio::test]
    async fn apply_upserts_tasks() {
        let store = InMemoryTaskStore::new();
        let owner: UserId = Ulid::new().into();
        let mut task = backlog_task(owner, None);

        store
            .apply(vec![StoreWrite::Task(task.clone())])
            .await
            .unwrap();
        task.transition(
            TaskPhase::Today { on: day(2024, 5, 20), rank: Rank::new(1) },
            instant(),
        );
        store
            .apply(vec![StoreWrite::Task(task.clone())])
            .await
            .unwrap();

        let loaded = store.get(task.task_id).await.unwrap().unwrap();
        assert_eq!(loaded.phase, task.phase);
        assert_eq!(store.tasks_of(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn today_older_than_skips_the_current_day() {
        let store = InMemoryTaskStore::new();
        let owner: UserId = Ulid::new().into();

        let mut stale = backlog_task(owner, None);
        stale.transition(
            TaskPhase::Today { on: day(2024, 5, 19), rank: Rank::new(1) },
            instant(),
        );
        let mut stale_done = backlog_task(owner, None);
        stale_done.transition(TaskPhase::TodayDone { on: day(2024, 5, 19) }, instant());
        let mut fresh = backlog_task(owner, None);
        fresh.transition(
            TaskPhase::Today { on: day(2024, 5, 20), rank: Rank::new(2) },
            instant(),
        );

        store
            .apply(vec![
                StoreWrite::Task(stale.clone()),
                StoreWrite::Task(stale_done.clone()),
                StoreWrite::Task(fresh.clone()),
            ])
            .await
            .unwrap();

        let found = store.today_older_than(day(2024, 5, 20)).await.unwrap();
        let ids: Vec<TaskId> = found.iter().map(|t| t.task_id).collect();

        assert_eq!(found.len(), 2);
        assert!(ids.contains(&stale.task_id));
        assert!(ids.contains(&stale_done.task_id));
        assert!(!ids.contains(&fresh.task_id));
    }

    #[tokio::test]
    async fn due_backlog_matches_the_exact_date_only() {
        let store = InMemoryTaskStore::new();
        let owner: UserId = Ulid::new().into();

        let due = backlog_task(owner, Some(day(2024, 5, 20)));
        let later = backlog_task(owner, Some(day(2024, 5, 21)));
        let undated = backlog_task(owner, None);
        let mut already_today = backlog_task(owner, Some(day(2024, 5, 20)));
        already_today.transition(
            TaskPhase::Today { on: day(2024, 5, 20), rank: Rank::new(1) },
            instant(),
        );

        store
            .apply(vec![
                StoreWrite::Task(due.clone()),
                StoreWrite::Task(later),
                StoreWrite::Task(undated),
                StoreWrite::Task(already_today),
            ])
            .await
            .unwrap();

        let found = store.due_backlog(day(2024, 5, 20)).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].task_id, due.task_id);
    }

    #[tokio::test]
    async fn completion_log_deletes_only_the_named_record() {
        let store = InMemoryTaskStore::new();
        let owner: UserId = Ulid::new().into();
        let task = backlog_task(owner, None);
        let older = CompletionRecord::new(
            Ulid::new().into(),
            task.task_id,
            instant() - chrono::Duration::days(1),
        );
        let current = CompletionRecord::new(Ulid::new().into(), task.task_id, instant());

        store
            .apply(vec![
                StoreWrite::Task(task.clone()),
                StoreWrite::PutCompletion(older.clone()),
                StoreWrite::PutCompletion(current.clone()),
            ])
            .await
            .unwrap();
        assert_eq!(
            store.completions_for_task(task.task_id).await.unwrap().len(),
            2
        );

        store
            .apply(vec![StoreWrite::DeleteCompletion(current.completion_id)])
            .await
            .unwrap();
        assert_eq!(
            store.completions_for_task(task.task_id).await.unwrap(),
            vec![older]
        );
    }

    #[tokio::test]
    async fn completions_between_filters_owner_and_window() {
        let store = InMemoryTaskStore::new();
        let owner: UserId = Ulid::new().into();
        let other: UserId = Ulid::new().into();

        let mine = backlog_task(owner, None);
        let theirs = backlog_task(other, None);
        let from = instant();
        let to = from + chrono::Duration::days(1);

        store
            .apply(vec![
                StoreWrite::Task(mine.clone()),
                StoreWrite::Task(theirs.clone()),
                StoreWrite::PutCompletion(CompletionRecord::new(
                    Ulid::new().into(),
                    mine.task_id,
                    from,
                )),
                StoreWrite::PutCompletion(CompletionRecord::new(
                    Ulid::new().into(),
                    mine.task_id,
                    to,
                )),
                StoreWrite::PutCompletion(CompletionRecord::new(
                    Ulid::new().into(),
                    theirs.task_id,
                    from,
                )),
            ])
            .await
            .unwrap();

        let found = store.completions_between(owner, from, to).await.unwrap();

        // half-open window: the record at `to` is out, the foreign one too
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].task_id, mine.task_id);
    }
}
