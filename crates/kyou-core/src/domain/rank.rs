//! Rank - ordering value within one owner's lists.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a task inside a rank pool.
///
/// The value itself carries no meaning outside comparison: lists render in
/// descending rank order, so a larger rank sits higher on the screen. New
/// entries at the top of a pool take `max + 1`, entries dropped to the
/// bottom take `min - 1`. Values may go negative; that is fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(i64);

impl Rank {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// The rank directly above this one.
    pub fn above(self) -> Rank {
        Rank(self.0 + 1)
    }

    /// The rank directly below this one.
    pub fn below(self) -> Rank {
        Rank(self.0 - 1)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn above_and_below_step_by_one() {
        let rank = Rank::new(3);

        assert_eq!(rank.above(), Rank::new(4));
        assert_eq!(rank.below(), Rank::new(2));
    }

    #[test]
    fn negative_ranks_compare_correctly() {
        assert!(Rank::new(-2) < Rank::new(0));
        assert!(Rank::new(0) < Rank::new(1));
    }
}
