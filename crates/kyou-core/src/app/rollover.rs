//! Rollover - the batch that closes one day and opens the next.
//!
//! Phase A (close-out) sweeps every today list older than the run date:
//! unfinished tasks become yesterday's carry-overs, finished repeating
//! tasks go back to the backlog, finished one-shots stay behind as
//! history. Phase B (promotion) pulls backlog tasks whose deadline is the
//! run date into the new today list. The phases are independently
//! runnable; a full pass is A then B.
//!
//! One owner's close-out is one commit, and promotion commits per chunk of
//! owners, so a crash mid-batch loses at most the tail, and the date guard
//! in the close-out query makes the re-run pick up exactly where the dead
//! run stopped.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{PoolRanks, StoreError, Task, TaskPhase, UserId};
use crate::ports::{Clock, StoreWrite, TaskStore};

/// Tunables for the daily batch.
#[derive(Debug, Clone)]
pub struct RolloverConfig {
    /// Owners whose promotions are committed together in phase B.
    pub promotion_chunk_size: usize,
}

impl RolloverConfig {
    pub fn default_v1() -> Self {
        Self { promotion_chunk_size: 100 }
    }
}

impl Default for RolloverConfig {
    fn default() -> Self {
        Self::default_v1()
    }
}

/// What one rollover pass did. Serialized into the batch log line.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RolloverReport {
    /// Unfinished today tasks moved to yesterday.
    pub carried_over: usize,
    /// Finished repeating tasks returned to the backlog.
    pub requeued: usize,
    /// Finished one-shots left behind as history.
    pub retained: usize,
    /// Deadline tasks pulled into the new today list.
    pub promoted: usize,
    /// Human-readable notes for every owner or chunk that failed. The
    /// batch keeps going; these are for the morning-after triage.
    pub failures: Vec<String>,
}

impl RolloverReport {
    fn absorb(&mut self, other: RolloverReport) {
        self.carried_over += other.carried_over;
        self.requeued += other.requeued;
        self.retained += other.retained;
        self.promoted += other.promoted;
        self.failures.extend(other.failures);
    }
}

/// The midnight batch.
///
/// Callers serialize runs externally (one scheduler process); the batch
/// itself only guarantees that re-running a date is harmless.
pub struct RolloverBatchProcessor {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    config: RolloverConfig,
}

impl RolloverBatchProcessor {
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>, config: RolloverConfig) -> Self {
        Self { store, clock, config }
    }

    /// One full pass for `run_date`: close out, then promote.
    pub async fn run(&self, run_date: NaiveDate) -> Result<RolloverReport, StoreError> {
        let mut report = self.close_out(run_date).await?;
        report.absorb(self.open_today(run_date).await?);
        tracing::info!(
            %run_date,
            carried_over = report.carried_over,
            requeued = report.requeued,
            retained = report.retained,
            promoted = report.promoted,
            failures = report.failures.len(),
            "rollover pass finished"
        );
        Ok(report)
    }

    /// Phase A: close out every today list whose day is over.
    ///
    /// Tasks already moved by a previous run no longer match the stale
    /// query, so a re-run of the same date finds nothing to do.
    pub async fn close_out(&self, run_date: NaiveDate) -> Result<RolloverReport, StoreError> {
        let mut report = RolloverReport::default();
        let stale = self.store.today_older_than(run_date).await?;

        for (owner, tasks) in group_by_owner(stale) {
            if let Err(e) = self.close_out_owner(owner, tasks, &mut report).await {
                tracing::error!(%owner, error = %e, "close-out failed, skipping owner");
                report.failures.push(format!("close-out {owner}: {e}"));
            }
        }
        Ok(report)
    }

    async fn close_out_owner(
        &self,
        owner: UserId,
        mut stale: Vec<Task>,
        report: &mut RolloverReport,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let pools = PoolRanks::collect(self.store.tasks_of(owner).await?.iter());

        // carry-overs and re-queued repeats stack above the existing
        // backlog pool, in the order the day's list held them: sweeping
        // bottom-up leaves the day's top task on top of the new stack,
        // with the unranked finished repeats underneath
        stale.sort_by_key(|task| task.phase.today_rank());
        let mut next_rank = pools.backlog_top();
        let mut writes = Vec::new();
        let mut carried_over = 0;
        let mut requeued = 0;
        let mut retained = 0;

        for mut task in stale {
            match task.phase {
                TaskPhase::Today { on, .. } => {
                    task.transition(TaskPhase::Yesterday { on, rank: next_rank }, now);
                    next_rank = next_rank.above();
                    carried_over += 1;
                    writes.push(StoreWrite::Task(task));
                }
                TaskPhase::TodayDone { .. } if task.repeating => {
                    task.transition(TaskPhase::Backlog { rank: next_rank }, now);
                    next_rank = next_rank.above();
                    requeued += 1;
                    writes.push(StoreWrite::Task(task));
                }
                TaskPhase::TodayDone { .. } => {
                    // finished one-shot: stays as history, nothing to write
                    retained += 1;
                }
                // the stale query only returns today-list phases
                _ => {}
            }
        }

        if !writes.is_empty() {
            self.store.apply(writes).await?;
        }
        report.carried_over += carried_over;
        report.requeued += requeued;
        report.retained += retained;
        Ok(())
    }

    /// Phase B: pull every backlog task due on `run_date` into the today
    /// list. Promotions land above the owner's current today pool, each
    /// with its own rank.
    pub async fn open_today(&self, run_date: NaiveDate) -> Result<RolloverReport, StoreError> {
        let mut report = RolloverReport::default();
        let due = self.store.due_backlog(run_date).await?;
        let owners: Vec<(UserId, Vec<Task>)> = group_by_owner(due).into_iter().collect();

        for chunk in owners.chunks(self.config.promotion_chunk_size.max(1)) {
            let mut writes = Vec::new();
            let mut promoted = 0;

            for (owner, tasks) in chunk {
                let pools = match self.store.tasks_of(*owner).await {
                    Ok(tasks) => PoolRanks::collect(tasks.iter()),
                    Err(e) => {
                        tracing::error!(%owner, error = %e, "promotion read failed, skipping owner");
                        report.failures.push(format!("promotion {owner}: {e}"));
                        continue;
                    }
                };
                let now = self.clock.now();
                let mut next_rank = pools.today_top();
                for task in tasks {
                    let mut task = task.clone();
                    task.transition(TaskPhase::Today { on: run_date, rank: next_rank }, now);
                    next_rank = next_rank.above();
                    writes.push(StoreWrite::Task(task));
                    promoted += 1;
                }
            }

            if writes.is_empty() {
                continue;
            }
            match self.store.apply(writes).await {
                Ok(()) => report.promoted += promoted,
                Err(e) => {
                    tracing::error!(error = %e, "promotion chunk commit failed");
                    report.failures.push(format!("promotion chunk: {e}"));
                }
            }
        }
        Ok(report)
    }
}

fn group_by_owner(tasks: Vec<Task>) -> BTreeMap<UserId, Vec<Task>> {
    let mut by_owner: BTreeMap<UserId, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        by_owner.entry(task.owner_id).or_default().push(task);
    }
    by_owner
}
