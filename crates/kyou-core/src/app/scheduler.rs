//! RolloverScheduler - fires the batch once a day at a configured local time.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ports::Clock;

use super::rollover::RolloverBatchProcessor;

/// When to fire, as a wall-clock time in a fixed zone.
///
/// "Today" is a calendar concept in the product's anchor zone, so the
/// trigger is configured the same way instead of in host UTC.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub daily_at: NaiveTime,
    pub zone: FixedOffset,
}

impl Schedule {
    /// The next instant strictly after `now` at which `daily_at` occurs in
    /// the anchor zone. Firing exactly at `now` resolves to tomorrow, so a
    /// tick can never double-fire.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_date = now.with_timezone(&self.zone).date_naive();
        let fire_naive = local_date.and_time(self.daily_at);
        let fire = Utc.from_utc_datetime(&(fire_naive - self.zone));
        if fire > now {
            fire
        } else {
            Utc.from_utc_datetime(&(fire_naive + chrono::Duration::days(1) - self.zone))
        }
    }
}

/// Handle to the daily loop.
///
/// - `request_shutdown()`: signal the loop to stop (idempotent).
/// - `shutdown_and_join().await`: signal and wait until it has stopped.
pub struct RolloverScheduler {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl RolloverScheduler {
    /// Spawn the loop. Every tick runs a full close-out-then-promote pass
    /// for the fire instant's local date and logs the report.
    ///
    /// Deploy exactly one scheduler process; the batch itself does not take
    /// the distributed lock.
    pub fn spawn(
        processor: Arc<RolloverBatchProcessor>,
        schedule: Schedule,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            scheduler_loop(processor, schedule, clock, &mut shutdown_rx).await;
        });
        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // 受信側が既に終了していても構わない
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn scheduler_loop(
    processor: Arc<RolloverBatchProcessor>,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            tracing::info!("rollover scheduler stopped");
            break;
        }

        let now = clock.now();
        let fire_at = schedule.next_fire_after(now);
        let wait = (fire_at - now).to_std().unwrap_or_default();
        tracing::debug!(%fire_at, "rollover scheduler armed");

        // 発火時刻まで待つ。シャットダウンが来たらループ先頭で判定する
        tokio::select! {
            _ = shutdown_rx.changed() => continue,
            _ = tokio::time::sleep(wait) => {}
        }

        let run_date = fire_at.with_timezone(&schedule.zone).date_naive();
        match processor.run(run_date).await {
            Ok(report) if report.failures.is_empty() => {}
            Ok(report) => {
                tracing::warn!(
                    %run_date,
                    failures = report.failures.len(),
                    "rollover finished with partial failures"
                );
            }
            Err(e) => {
                // leave the data to the next tick; close-out re-runs are safe
                tracing::error!(%run_date, error = %e, "rollover pass failed");
            }
        }
    }
}
