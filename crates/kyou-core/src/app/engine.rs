//! TaskOrderingEngine - user-initiated transitions and the rank rules.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{
    CategoryId, CompletionRecord, EngineError, ListKind, PoolRanks, Task, TaskId, TaskPhase,
    UserId, ordering,
};
use crate::ports::{Clock, IdGenerator, StoreWrite, TaskStore};

/// One owner's today screen: unfinished entries rank-descending, then the
/// finished ones in the order they were completed.
#[derive(Debug, Clone, Serialize)]
pub struct TodayView {
    pub active: Vec<Task>,
    pub done: Vec<CompletedEntry>,
}

/// The yesterday screen: what slipped, then what got marked done late.
#[derive(Debug, Clone, Serialize)]
pub struct YesterdayView {
    pub pending: Vec<Task>,
    pub done: Vec<Task>,
}

/// A finished task joined with its completion instant.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedEntry {
    pub task: Task,
    pub completed_at: DateTime<Utc>,
}

/// The task lifecycle engine.
///
/// Owns every user-initiated transition: swipe between backlog and today,
/// the completion toggle, bookmarking and drag reorder. Each call reads the
/// affected rows fresh, computes the outcome in memory and commits it as
/// one atomic write-set; ranks are never carried over from a previous call.
/// A mutating call also holds its owner's gate from the first read to the
/// commit, so two calls for one owner never interleave a rank computation.
/// Different owners proceed in parallel.
///
/// Dispatch over [`TaskPhase`] is a plain `match`, so adding a phase walks
/// the compiler through every operation that has to learn about it.
pub struct TaskOrderingEngine {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    /// The calendar anchor. "Today" means the current date in this zone,
    /// wherever the server itself runs.
    zone: FixedOffset,
    /// One gate per owner. The store only makes the write-set atomic; the
    /// gate covers the read-to-commit span of a mutating call.
    owner_gates: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl TaskOrderingEngine {
    pub fn new(
        store: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        zone: FixedOffset,
    ) -> Self {
        Self { store, clock, ids, zone, owner_gates: Mutex::new(HashMap::new()) }
    }

    /// Create a task at the top of the owner's backlog.
    pub async fn add_task(
        &self,
        owner: UserId,
        content: impl Into<String>,
        category_id: Option<CategoryId>,
        deadline: Option<NaiveDate>,
        repeating: bool,
    ) -> Result<Task, EngineError> {
        let gate = self.owner_gate(owner).await;
        let _serialized = gate.lock().await;
        let now = self.clock.now();
        let pools = self.pools_of(owner).await?;
        let task = Task::new(
            self.ids.generate_task_id(),
            owner,
            category_id,
            content,
            deadline,
            repeating,
            pools.backlog_top(),
            now,
        );
        self.store.apply(vec![StoreWrite::Task(task.clone())]).await?;
        Ok(task)
    }

    /// Move a task between backlog and today. Either direction enters the
    /// destination pool at the top.
    pub async fn swipe(&self, owner: UserId, task_id: TaskId) -> Result<Task, EngineError> {
        let gate = self.owner_gate(owner).await;
        let _serialized = gate.lock().await;
        let now = self.clock.now();
        let mut task = self.owned_task(owner, task_id).await?;
        let pools = self.pools_of(owner).await?;

        let next = match task.phase {
            TaskPhase::Backlog { .. } => TaskPhase::Today {
                on: self.local_date(now),
                rank: pools.today_top(),
            },
            TaskPhase::Today { .. } => TaskPhase::Backlog { rank: pools.backlog_top() },
            TaskPhase::TodayDone { .. } => {
                return Err(EngineError::AlreadyCompleted(task_id));
            }
            TaskPhase::Yesterday { .. } | TaskPhase::YesterdayDone { .. } => {
                return Err(EngineError::CannotSwipeYesterday(task_id));
            }
        };

        task.transition(next, now);
        self.store.apply(vec![StoreWrite::Task(task.clone())]).await?;
        Ok(task)
    }

    /// Flip a task's completion.
    ///
    /// Completing writes a record; uncompleting looks up the record written
    /// since the task's active day began, deletes it and re-ranks the task.
    /// The lookup must land on exactly one record; zero or several is
    /// corruption and the toggle refuses to guess. Older records of a repeat
    /// task belong to past days and are left alone. A today task re-enters
    /// its pool at the bottom (it was just dismissed as not-actually-done);
    /// a yesterday task re-enters the backlog pool at the top. Completing a
    /// yesterday task back-dates the record to the evening of the day it
    /// was active on, because that is when the work actually happened.
    pub async fn toggle_complete(
        &self,
        owner: UserId,
        task_id: TaskId,
    ) -> Result<Task, EngineError> {
        let gate = self.owner_gate(owner).await;
        let _serialized = gate.lock().await;
        let now = self.clock.now();
        let mut task = self.owned_task(owner, task_id).await?;

        match task.phase {
            TaskPhase::Today { on, .. } => {
                let record =
                    CompletionRecord::new(self.ids.generate_completion_id(), task_id, now);
                task.transition(TaskPhase::TodayDone { on }, now);
                self.store
                    .apply(vec![
                        StoreWrite::Task(task.clone()),
                        StoreWrite::PutCompletion(record),
                    ])
                    .await?;
            }
            TaskPhase::TodayDone { on } => {
                let record = self.current_completion(task_id, on).await?;
                let pools = self.pools_of(owner).await?;
                task.transition(TaskPhase::Today { on, rank: pools.today_bottom() }, now);
                self.store
                    .apply(vec![
                        StoreWrite::Task(task.clone()),
                        StoreWrite::DeleteCompletion(record.completion_id),
                    ])
                    .await?;
            }
            TaskPhase::Yesterday { on, .. } => {
                let record = CompletionRecord::new(
                    self.ids.generate_completion_id(),
                    task_id,
                    self.end_of_day(on),
                );
                task.transition(TaskPhase::YesterdayDone { on }, now);
                self.store
                    .apply(vec![
                        StoreWrite::Task(task.clone()),
                        StoreWrite::PutCompletion(record),
                    ])
                    .await?;
            }
            TaskPhase::YesterdayDone { on } => {
                let record = self.current_completion(task_id, on).await?;
                let pools = self.pools_of(owner).await?;
                task.transition(
                    TaskPhase::Yesterday { on, rank: pools.backlog_top() },
                    now,
                );
                self.store
                    .apply(vec![
                        StoreWrite::Task(task.clone()),
                        StoreWrite::DeleteCompletion(record.completion_id),
                    ])
                    .await?;
            }
            TaskPhase::Backlog { .. } => {
                return Err(EngineError::CannotCompleteBacklog(task_id));
            }
        }

        Ok(task)
    }

    /// Flip the bookmark flag. Works in any phase.
    pub async fn toggle_bookmark(
        &self,
        owner: UserId,
        task_id: TaskId,
    ) -> Result<Task, EngineError> {
        let gate = self.owner_gate(owner).await;
        let _serialized = gate.lock().await;
        let now = self.clock.now();
        let mut task = self.owned_task(owner, task_id).await?;
        task.set_bookmarked(!task.bookmarked, now);
        self.store.apply(vec![StoreWrite::Task(task.clone())]).await?;
        Ok(task)
    }

    /// Drag-and-drop reorder within one rank pool.
    ///
    /// `ordered_ids` is the desired order of the dragged subset, topmost
    /// first. Only the referenced tasks are written: their current rank
    /// values are redistributed among them, so tasks outside the subset
    /// keep both their rank and their relative position.
    pub async fn reorder(
        &self,
        owner: UserId,
        kind: ListKind,
        ordered_ids: &[TaskId],
    ) -> Result<Vec<Task>, EngineError> {
        if ordered_ids.len() < 2 {
            return Err(EngineError::ReorderTooFew(ordered_ids.len()));
        }
        let mut seen = HashSet::new();
        for task_id in ordered_ids {
            if !seen.insert(*task_id) {
                return Err(EngineError::ReorderDuplicate(*task_id));
            }
        }

        let gate = self.owner_gate(owner).await;
        let _serialized = gate.lock().await;
        let now = self.clock.now();
        let mut tasks = Vec::with_capacity(ordered_ids.len());
        let mut current_ranks = Vec::with_capacity(ordered_ids.len());
        for &task_id in ordered_ids {
            let task = self.owned_task(owner, task_id).await?;
            let rank = match (kind, task.phase) {
                (ListKind::Today, TaskPhase::Today { rank, .. }) => rank,
                (ListKind::Today, TaskPhase::TodayDone { .. }) => {
                    return Err(EngineError::AlreadyCompleted(task_id));
                }
                (ListKind::Backlog, TaskPhase::Backlog { rank })
                | (ListKind::Backlog, TaskPhase::Yesterday { rank, .. }) => rank,
                _ => return Err(EngineError::NotInList { task: task_id, expected: kind }),
            };
            tasks.push(task);
            current_ranks.push(rank);
        }

        let assignments = ordering::redistribute(current_ranks, ordered_ids);
        let mut writes = Vec::with_capacity(tasks.len());
        let mut reordered = Vec::with_capacity(tasks.len());
        for (mut task, (_, rank)) in tasks.into_iter().zip(assignments) {
            task.transition(task.phase.reranked(rank), now);
            writes.push(StoreWrite::Task(task.clone()));
            reordered.push(task);
        }
        self.store.apply(writes).await?;
        Ok(reordered)
    }

    /// The today screen for `date`.
    pub async fn today_view(
        &self,
        owner: UserId,
        date: NaiveDate,
    ) -> Result<TodayView, EngineError> {
        let tasks = self.store.tasks_of(owner).await?;

        let mut active: Vec<Task> = tasks
            .iter()
            .filter(|t| matches!(t.phase, TaskPhase::Today { on, .. } if on == date))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.phase.today_rank().cmp(&a.phase.today_rank()));

        // join each finished task with its current record; the record may
        // sit past the day's end when the toggle came after local midnight
        let (from, _) = self.day_window(date);
        let mut done = Vec::new();
        for task in tasks
            .iter()
            .filter(|t| matches!(t.phase, TaskPhase::TodayDone { on } if on == date))
        {
            let records = self.store.completions_for_task(task.task_id).await?;
            if let Some(record) = records.iter().find(|r| r.completed_at >= from) {
                done.push(CompletedEntry {
                    task: task.clone(),
                    completed_at: record.completed_at,
                });
            }
        }
        done.sort_by_key(|entry| entry.completed_at);

        Ok(TodayView { active, done })
    }

    /// The backlog screen: backlog tasks and unfinished carry-overs share
    /// one pool, but this view shows the backlog proper.
    pub async fn backlog_view(&self, owner: UserId) -> Result<Vec<Task>, EngineError> {
        let mut tasks: Vec<Task> = self
            .store
            .tasks_of(owner)
            .await?
            .into_iter()
            .filter(|t| matches!(t.phase, TaskPhase::Backlog { .. }))
            .collect();
        tasks.sort_by(|a, b| b.phase.backlog_rank().cmp(&a.phase.backlog_rank()));
        Ok(tasks)
    }

    /// The yesterday screen: still-pending carry-overs rank-descending,
    /// then the late completions in the order they were toggled.
    pub async fn yesterday_view(&self, owner: UserId) -> Result<YesterdayView, EngineError> {
        let tasks = self.store.tasks_of(owner).await?;

        let mut pending: Vec<Task> = tasks
            .iter()
            .filter(|t| matches!(t.phase, TaskPhase::Yesterday { .. }))
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.phase.backlog_rank().cmp(&a.phase.backlog_rank()));

        let mut done: Vec<Task> = tasks
            .iter()
            .filter(|t| matches!(t.phase, TaskPhase::YesterdayDone { .. }))
            .cloned()
            .collect();
        done.sort_by_key(|t| t.updated_at);

        Ok(YesterdayView { pending, done })
    }

    /// History: everything finished on `date`, earliest first. Calendar
    /// screens read this.
    pub async fn completed_on(
        &self,
        owner: UserId,
        date: NaiveDate,
    ) -> Result<Vec<CompletedEntry>, EngineError> {
        let (from, to) = self.day_window(date);
        let mut records = self.store.completions_between(owner, from, to).await?;
        records.sort_by_key(|r| r.completed_at);

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            if let Some(task) = self.store.get(record.task_id).await? {
                entries.push(CompletedEntry { task, completed_at: record.completed_at });
            }
        }
        Ok(entries)
    }

    async fn owned_task(&self, owner: UserId, task_id: TaskId) -> Result<Task, EngineError> {
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or(EngineError::NotFound(task_id))?;
        if task.owner_id != owner {
            return Err(EngineError::ForeignTask { task: task_id, owner });
        }
        Ok(task)
    }

    async fn pools_of(&self, owner: UserId) -> Result<PoolRanks, EngineError> {
        let tasks = self.store.tasks_of(owner).await?;
        Ok(PoolRanks::collect(tasks.iter()))
    }

    /// The serialization gate for one owner's mutations. Entries live for
    /// the engine's lifetime, one per owner seen.
    async fn owner_gate(&self, owner: UserId) -> Arc<Mutex<()>> {
        let mut gates = self.owner_gates.lock().await;
        Arc::clone(gates.entry(owner).or_default())
    }

    /// The record of the task's current completion: the single record
    /// written since `on`'s local day began. Records before that belong to
    /// a repeat task's past days and do not count. There is no upper bound;
    /// a toggle after local midnight stamps the record past `on`'s own day
    /// while the nightly sweep has not moved the task yet.
    async fn current_completion(
        &self,
        task_id: TaskId,
        on: NaiveDate,
    ) -> Result<CompletionRecord, EngineError> {
        let (from, _) = self.day_window(on);
        let mut records = self.store.completions_for_task(task_id).await?;
        records.retain(|r| r.completed_at >= from);
        match records.len() {
            0 => Err(EngineError::CompletionRecordMissing(task_id)),
            1 => Ok(records.remove(0)),
            found => Err(EngineError::CompletionRecordDuplicated { task: task_id, found }),
        }
    }

    fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.zone).date_naive()
    }

    /// 23:59 of `date` in the anchor zone, as a UTC instant. Late
    /// completions land on this minute.
    fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let last_minute = NaiveTime::from_hms_opt(23, 59, 0).expect("valid wall clock time");
        Utc.from_utc_datetime(&(date.and_time(last_minute) - self.zone))
    }

    /// `[start, end)` of the local calendar day, as UTC instants.
    fn day_window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.from_utc_datetime(&(date.and_time(NaiveTime::MIN) - self.zone));
        (start, start + chrono::Duration::days(1))
    }
}
