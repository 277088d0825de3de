//! LockStore port - the coordination store seam (Redis in production).
//!
//! Both operations must execute as single atomic steps on the store side.
//! `put_if_absent` is the `SET key value NX PX ttl` shape; `remove_if_match`
//! is the scripted compare-and-delete. A client-side read-then-write pair
//! would reopen exactly the race the token exists to close.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use ulid::Ulid;

/// Proof of one acquisition.
///
/// Fresh and unguessable per acquire. Release presents it, so a caller
/// whose lock already expired can never free a successor's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockToken(Ulid);

impl LockToken {
    pub fn fresh() -> Self {
        Self(Ulid::new())
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure raised by a `LockStore` adapter.
#[derive(Debug, Error)]
pub enum LockStoreError {
    #[error("lock store operation failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait LockStore: Send + Sync {
    /// Atomically bind `key -> token` with expiry `ttl`, but only if the
    /// key is absent or expired. Returns `false` when someone else holds
    /// it; the caller must not touch the guarded resource in that case.
    async fn put_if_absent(
        &self,
        key: &str,
        token: LockToken,
        ttl: Duration,
    ) -> Result<bool, LockStoreError>;

    /// Atomically delete `key`, but only if it currently holds `token`.
    /// Returns `false` when the key is gone or bound to a different token.
    async fn remove_if_match(&self, key: &str, token: LockToken)
    -> Result<bool, LockStoreError>;
}
