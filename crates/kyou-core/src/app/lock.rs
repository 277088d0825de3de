//! Distributed lock - short-lived mutual exclusion over the lock store.
//!
//! Two pieces. [`DistributedLock`] is the primitive: TTL-bounded,
//! token-verified acquire and release. [`DistributedLock::run_exclusive`]
//! wraps one unit of work in acquire, run, release, with the release taken
//! on every exit path. Contention is reported immediately; there is no
//! waiting, retrying or queueing here. The canonical use is collapsing
//! duplicate concurrent signups for the same external identity into one
//! account.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::ports::{LockStore, LockStoreError, LockToken};

/// Namespace prefix for every key in the shared coordination store.
const KEY_PREFIX: &str = "lock:";

/// Default window before an abandoned lock frees itself.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LockError {
    /// Someone else holds the key right now. Expected under duplicate
    /// concurrent requests; a caller concern, not a server fault.
    #[error("lock busy: {0}")]
    Contended(String),

    #[error(transparent)]
    Store(#[from] LockStoreError),
}

/// Outcome of [`DistributedLock::run_exclusive`]. Contention, the work's
/// own failure and a store failure are three different situations and stay
/// distinguishable.
#[derive(Debug, Error)]
pub enum ExclusiveError<E> {
    #[error("lock busy: {0}")]
    Contended(String),

    #[error("{0}")]
    Work(E),

    #[error(transparent)]
    Store(#[from] LockStoreError),
}

impl<E> ExclusiveError<E> {
    /// True when the failure only means "someone else got there first".
    pub fn is_contention(&self) -> bool {
        matches!(self, ExclusiveError::Contended(_))
    }
}

/// Mutual exclusion across processes, keyed by caller-chosen strings.
///
/// The mechanism knows nothing about what it guards; key naming conventions
/// (`signup:<provider-id>` and the like) belong to the callers.
pub struct DistributedLock {
    store: Arc<dyn LockStore>,
    ttl: Duration,
}

impl DistributedLock {
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self::with_ttl(store, DEFAULT_TTL)
    }

    pub fn with_ttl(store: Arc<dyn LockStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn storage_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    /// Try to take the lock. Every call mints a fresh token; a held key
    /// fails with [`LockError::Contended`] right away.
    pub async fn acquire(&self, key: &str) -> Result<LockToken, LockError> {
        let token = LockToken::fresh();
        let stored = self
            .store
            .put_if_absent(&Self::storage_key(key), token, self.ttl)
            .await?;
        if stored {
            tracing::debug!(key, %token, "lock acquired");
            Ok(token)
        } else {
            Err(LockError::Contended(key.to_string()))
        }
    }

    /// Release the lock if `token` still owns it.
    ///
    /// A stale or foreign token is a quiet no-op: past the TTL the key may
    /// already belong to someone else, and a late release must never take
    /// the new holder down.
    pub async fn release(&self, key: &str, token: LockToken) -> Result<(), LockError> {
        let removed = self
            .store
            .remove_if_match(&Self::storage_key(key), token)
            .await?;
        if !removed {
            tracing::debug!(key, "release skipped, token no longer owns the lock");
        }
        Ok(())
    }

    /// Run `work` while holding the lock on `key`.
    ///
    /// When the key is busy the work never starts. Otherwise the work runs
    /// exactly once and the lock is released before its result, success or
    /// the work's own error, comes back unchanged. A failed release is
    /// logged rather than raised: the TTL bounds the damage, and a stuck
    /// lock entry must not mask the work's outcome.
    pub async fn run_exclusive<T, E, F, Fut>(
        &self,
        key: &str,
        work: F,
    ) -> Result<T, ExclusiveError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let token = match self.acquire(key).await {
            Ok(token) => token,
            Err(LockError::Contended(key)) => return Err(ExclusiveError::Contended(key)),
            Err(LockError::Store(e)) => return Err(ExclusiveError::Store(e)),
        };

        let result = work().await;

        if let Err(e) = self.release(key, token).await {
            tracing::warn!(key, error = %e, "failed to release lock, ttl will reclaim it");
        }

        result.map_err(ExclusiveError::Work)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryLockStore;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn lock() -> DistributedLock {
        DistributedLock::new(Arc::new(InMemoryLockStore::new()))
    }

    #[tokio::test]
    async fn acquire_then_release_frees_the_key() {
        let lock = lock();

        let token = lock.acquire("signup:google-123").await.unwrap();
        lock.release("signup:google-123", token).await.unwrap();

        lock.acquire("signup:google-123").await.unwrap();
    }

    #[tokio::test]
    async fn second_acquire_reports_contention() {
        let lock = lock();
        let _held = lock.acquire("signup:google-123").await.unwrap();

        let err = lock.acquire("signup:google-123").await.unwrap_err();

        assert!(matches!(err, LockError::Contended(_)));
    }

    #[tokio::test]
    async fn keys_do_not_interfere() {
        let lock = lock();
        let _a = lock.acquire("signup:google-123").await.unwrap();

        lock.acquire("signup:apple-9").await.unwrap();
    }

    #[tokio::test]
    async fn release_with_a_foreign_token_leaves_the_lock_held() {
        let lock = lock();
        let _held = lock.acquire("roll").await.unwrap();

        lock.release("roll", LockToken::fresh()).await.unwrap();

        let err = lock.acquire("roll").await.unwrap_err();
        assert!(matches!(err, LockError::Contended(_)));
    }

    #[tokio::test]
    async fn expired_lock_is_reacquirable_and_safe_from_the_old_holder() {
        let lock = DistributedLock::with_ttl(
            Arc::new(InMemoryLockStore::new()),
            Duration::from_millis(30),
        );

        let stale = lock.acquire("roll").await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let _fresh = lock.acquire("roll").await.unwrap();
        // the old holder waking up late must not free the new holder's lock
        lock.release("roll", stale).await.unwrap();
        let err = lock.acquire("roll").await.unwrap_err();
        assert!(matches!(err, LockError::Contended(_)));
    }

    #[tokio::test]
    async fn run_exclusive_releases_on_the_error_path() {
        let lock = lock();

        let out: Result<(), ExclusiveError<&str>> = lock
            .run_exclusive("signup:x", || async { Err("account lookup failed") })
            .await;

        assert!(matches!(out, Err(ExclusiveError::Work("account lookup failed"))));
        // released despite the failure
        lock.acquire("signup:x").await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_duplicates_run_the_work_once() {
        let lock = Arc::new(lock());
        let runs = Arc::new(AtomicU32::new(0));

        let mut joins = Vec::new();
        for _ in 0..8 {
            let lock = Arc::clone(&lock);
            let runs = Arc::clone(&runs);
            joins.push(tokio::spawn(async move {
                lock.run_exclusive("signup:google-123", || async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok::<(), Infallible>(())
                })
                .await
            }));
        }

        let mut won = 0;
        let mut contended = 0;
        for join in joins {
            match join.await.unwrap() {
                Ok(()) => won += 1,
                Err(e) if e.is_contention() => contended += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(won, 1);
        assert_eq!(contended, 7);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
