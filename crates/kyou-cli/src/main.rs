//! kyou-cli - end-to-end walkthrough of the task lifecycle engine.
//!
//! Wires the in-memory adapters together and drives one user through a
//! day: seeding tasks, swiping, completing, a duplicate-signup burst
//! against the distributed lock, and one forced rollover pass.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};
use tracing_subscriber::EnvFilter;

use kyou_core::app::{
    DistributedLock, RolloverBatchProcessor, RolloverConfig, RolloverScheduler, Schedule,
    TaskOrderingEngine,
};
use kyou_core::domain::{ListKind, UserId};
use kyou_core::impls::{InMemoryLockStore, InMemoryTaskStore};
use kyou_core::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};

struct CliConfig {
    rollover_at: NaiveTime,
    zone: FixedOffset,
    promotion_chunk_size: usize,
    lock_ttl: Duration,
}

fn load_config() -> CliConfig {
    let rollover_at = std::env::var("KYOU_ROLLOVER_AT")
        .ok()
        .and_then(|raw| NaiveTime::parse_from_str(&raw, "%H:%M").ok())
        .unwrap_or(NaiveTime::MIN);
    let zone_hours: i32 = std::env::var("KYOU_ZONE_OFFSET_HOURS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(9);
    let zone = FixedOffset::east_opt(zone_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(9 * 3600).expect("+09:00 is a valid offset"));
    let promotion_chunk_size = std::env::var("KYOU_PROMOTION_CHUNK")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(100);
    let lock_ttl = std::env::var("KYOU_LOCK_TTL_MS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(kyou_core::app::lock::DEFAULT_TTL);
    CliConfig { rollover_at, zone, promotion_chunk_size, lock_ttl }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = load_config();
    tracing::info!(
        rollover_at = %config.rollover_at,
        zone = %config.zone,
        "kyou demo starting"
    );

    // (A) wire the services against the in-memory adapters
    let store = Arc::new(InMemoryTaskStore::new());
    let clock = Arc::new(SystemClock);
    let ids = Arc::new(UlidGenerator::new(SystemClock));
    let engine = Arc::new(TaskOrderingEngine::new(
        store.clone(),
        clock.clone(),
        ids.clone(),
        config.zone,
    ));
    let lock = Arc::new(DistributedLock::with_ttl(
        Arc::new(InMemoryLockStore::new()),
        config.lock_ttl,
    ));
    let processor = Arc::new(RolloverBatchProcessor::new(
        store.clone(),
        clock.clone(),
        RolloverConfig { promotion_chunk_size: config.promotion_chunk_size },
    ));

    // (B) seed one user's day
    let owner = ids.generate_user_id();
    let today = clock.now().with_timezone(&config.zone).date_naive();
    println!("(B) seeding tasks for {owner} on {today}");

    let groceries = engine.add_task(owner, "buy groceries", None, None, false).await?;
    let journal = engine.add_task(owner, "write journal", None, None, true).await?;
    let stretch = engine.add_task(owner, "stretch 10 minutes", None, None, false).await?;
    let invoice = engine
        .add_task(owner, "send the invoice", None, Some(today.succ_opt().ok_or("calendar overflow")?), false)
        .await?;

    engine.swipe(owner, groceries.task_id).await?;
    engine.swipe(owner, journal.task_id).await?;
    engine.toggle_complete(owner, journal.task_id).await?;
    engine.toggle_bookmark(owner, invoice.task_id).await?;
    engine
        .reorder(owner, ListKind::Backlog, &[stretch.task_id, invoice.task_id])
        .await?;

    let view = engine.today_view(owner, today).await?;
    println!("(B) today view:\n{}", serde_json::to_string_pretty(&view)?);
    let backlog = engine.backlog_view(owner).await?;
    println!(
        "(B) backlog order: {:?}",
        backlog.iter().map(|t| t.content.as_str()).collect::<Vec<_>>()
    );

    // (C) duplicate signup burst: four requests race for one external
    // identity, the lock lets exactly one create the account
    println!("(C) signup burst for one external identity");
    let accounts: Arc<tokio::sync::Mutex<HashMap<String, UserId>>> =
        Arc::new(tokio::sync::Mutex::new(HashMap::new()));
    let provider_key = "google-4242";

    let mut attempts = Vec::new();
    for _ in 0..4 {
        let lock = Arc::clone(&lock);
        let accounts = Arc::clone(&accounts);
        let ids = Arc::clone(&ids);
        attempts.push(tokio::spawn(async move {
            lock.run_exclusive(&format!("signup:{provider_key}"), || async move {
                // the window where two unlocked requests would both
                // conclude "no account yet"
                tokio::time::sleep(Duration::from_millis(25)).await;
                let mut accounts = accounts.lock().await;
                let user = *accounts
                    .entry(provider_key.to_string())
                    .or_insert_with(|| ids.generate_user_id());
                Ok::<UserId, Infallible>(user)
            })
            .await
        }));
    }

    let mut signed_up = 0;
    let mut told_to_retry = 0;
    for attempt in attempts {
        match attempt.await? {
            Ok(user) => {
                signed_up += 1;
                println!("(C) signup won the lock: {user}");
            }
            Err(e) if e.is_contention() => told_to_retry += 1,
            Err(e) => return Err(e.into()),
        }
    }
    println!(
        "(C) {signed_up} created, {told_to_retry} saw contention, {} account(s) exist",
        accounts.lock().await.len()
    );

    // (D) force one rollover pass for tomorrow to show the close-out and
    // the deadline promotion without waiting for midnight
    let tomorrow = today.succ_opt().ok_or("calendar overflow")?;
    println!("(D) forcing a rollover pass for {tomorrow}");
    let report = processor.run(tomorrow).await?;
    println!("(D) report:\n{}", serde_json::to_string_pretty(&report)?);

    let view = engine.yesterday_view(owner).await?;
    println!(
        "(D) yesterday now holds: {:?}",
        view.pending.iter().map(|t| t.content.as_str()).collect::<Vec<_>>()
    );

    // (E) arm the real scheduler briefly, then shut it down
    let schedule = Schedule { daily_at: config.rollover_at, zone: config.zone };
    let scheduler = RolloverScheduler::spawn(processor, schedule, clock);
    println!("(E) scheduler armed for {} ({}), shutting down", config.rollover_at, config.zone);
    tokio::time::sleep(Duration::from_millis(200)).await;
    scheduler.shutdown_and_join().await;
    println!("(E) done");

    Ok(())
}
