//! In-memory LockStore for development and tests.
//!
//! TTL は参照時に遅延評価する。期限切れエントリは「存在しない」扱いで、
//! 触れたときに掃除する。

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::ports::{LockStore, LockStoreError, LockToken};

struct Entry {
    token: LockToken,
    expires_at: Instant,
}

/// In-memory `LockStore`.
///
/// Each operation runs its whole check-and-write under one lock guard,
/// standing in for the store-side atomicity the production adapter gets
/// from `SET NX PX` and a scripted compare-and-delete.
pub struct InMemoryLockStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryLockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn put_if_absent(
        &self,
        key: &str,
        token: LockToken,
        ttl: Duration,
    ) -> Result<bool, LockStoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let held = entries
            .get(key)
            .map(|entry| entry.expires_at > now)
            .unwrap_or(false);
        if held {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry { token, expires_at: now + ttl },
        );
        Ok(true)
    }

    async fn remove_if_match(
        &self,
        key: &str,
        token: LockToken,
    ) -> Result<bool, LockStoreError> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let Some(entry) = entries.get(key) else {
            return Ok(false);
        };
        let live = entry.expires_at > now;
        let owned_by_caller = live && entry.token == token;
        if owned_by_caller || !live {
            // a matching release removes the entry; expired ones are swept
            // on touch either way
            entries.remove(key);
        }
        Ok(owned_by_caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn second_put_on_a_held_key_fails() {
        let store = InMemoryLockStore::new();

        assert!(store.put_if_absent("k", LockToken::fresh(), TTL).await.unwrap());
        assert!(!store.put_if_absent("k", LockToken::fresh(), TTL).await.unwrap());
    }

    #[tokio::test]
    async fn remove_requires_the_matching_token() {
        let store = InMemoryLockStore::new();
        let holder = LockToken::fresh();
        store.put_if_absent("k", holder, TTL).await.unwrap();

        assert!(!store.remove_if_match("k", LockToken::fresh()).await.unwrap());
        // the wrong token must not have evicted the holder
        assert!(!store.put_if_absent("k", LockToken::fresh(), TTL).await.unwrap());
        assert!(store.remove_if_match("k", holder).await.unwrap());
        assert!(store.put_if_absent("k", LockToken::fresh(), TTL).await.unwrap());
    }

    #[tokio::test]
    async fn expired_entries_count_as_absent() {
        let store = InMemoryLockStore::new();
        let stale = LockToken::fresh();
        store
            .put_if_absent("k", stale, Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        // the key is free again, and the stale token no longer matches
        assert!(!store.remove_if_match("k", stale).await.unwrap());
        assert!(store.put_if_absent("k", LockToken::fresh(), TTL).await.unwrap());
    }
}
