//! Domain identifiers (strongly-typed IDs).
//!
//! ULID ベースの ID を Phantom type パターンで共有実装する。
//! `UserId` と `TaskId` は実体こそ同じだが、コンパイル時には別の型として
//! 扱われるため取り違えできない。
//!
//! ULID properties that matter here:
//! - lexicographically sortable (the timestamp occupies the high bits)
//! - generatable on any node without coordination
//! - 128-bit, so it fits wherever a UUID fits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for each ID kind.
///
/// Supplies the prefix used by `Display` ("user-", "task-", ...). The
/// prefix is cosmetic; equality and ordering look only at the ULID.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic identifier.
///
/// `T` is a zero-sized marker type: it costs nothing at runtime and keeps
/// the ID kinds apart at compile time.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Marker for account identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn prefix() -> &'static str {
        "user-"
    }
}

/// Marker for task identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

/// Marker for category identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {}

impl IdMarker for Category {
    fn prefix() -> &'static str {
        "cat-"
    }
}

/// Marker for completion record identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Completion {}

impl IdMarker for Completion {
    fn prefix() -> &'static str {
        "done-"
    }
}

pub type UserId = Id<User>;
pub type TaskId = Id<Task>;
pub type CategoryId = Id<Category>;
pub type CompletionId = Id<Completion>;
