//! Ordering policy - rank pools and the drag-reorder computation.
//!
//! Pure functions only; everything here is exercised by the engine but
//! testable without a store or a clock.

use super::ids::TaskId;
use super::rank::Rank;
use super::task::Task;

/// Which rank pool a reorder touches.
///
/// The yesterday list has no pool of its own: its unfinished entries rank
/// inside the backlog pool, so a backlog reorder may move them too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Today,
    Backlog,
}

/// Rank values currently occupying one owner's two pools.
#[derive(Debug, Default)]
pub struct PoolRanks {
    pub today: Vec<Rank>,
    pub backlog: Vec<Rank>,
}

impl PoolRanks {
    pub fn collect<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut pools = PoolRanks::default();
        for task in tasks {
            if let Some(rank) = task.phase.today_rank() {
                pools.today.push(rank);
            }
            if let Some(rank) = task.phase.backlog_rank() {
                pools.backlog.push(rank);
            }
        }
        pools
    }

    /// Rank for a task entering the today pool at the top.
    pub fn today_top(&self) -> Rank {
        top_of(self.today.iter().copied())
    }

    /// Rank for a task re-entering the today pool at the bottom.
    pub fn today_bottom(&self) -> Rank {
        bottom_of(self.today.iter().copied())
    }

    /// Rank for a task entering the backlog pool at the top.
    pub fn backlog_top(&self) -> Rank {
        top_of(self.backlog.iter().copied())
    }
}

/// `max + 1` over the pool; an empty pool seeds at rank 1.
pub fn top_of(pool: impl IntoIterator<Item = Rank>) -> Rank {
    pool.into_iter()
        .max()
        .map(Rank::above)
        .unwrap_or_else(|| Rank::new(1))
}

/// `min - 1` over the pool; an empty pool seeds at rank 1.
pub fn bottom_of(pool: impl IntoIterator<Item = Rank>) -> Rank {
    pool.into_iter()
        .min()
        .map(Rank::below)
        .unwrap_or_else(|| Rank::new(1))
}

/// Reassign an existing rank set to a new display order.
///
/// `current_ranks` holds the referenced tasks' present ranks (any order),
/// `desired_top_down` the wanted order, topmost first. The rank *set* is
/// preserved: the first id receives the largest collected rank, the last
/// the smallest. Because only ranks already owned by the referenced tasks
/// are handed out, every task outside the subset keeps both its rank value
/// and its position relative to the subset.
///
/// Callers pass exactly one rank per id; extra or missing ranks are a
/// caller bug.
pub fn redistribute(current_ranks: Vec<Rank>, desired_top_down: &[TaskId]) -> Vec<(TaskId, Rank)> {
    debug_assert_eq!(current_ranks.len(), desired_top_down.len());
    let mut ranks = current_ranks;
    // descending, so the head of the id list pairs with the top rank
    ranks.sort_unstable_by(|a, b| b.cmp(a));
    desired_top_down.iter().copied().zip(ranks).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;
    use ulid::Ulid;

    fn ids(n: usize) -> Vec<TaskId> {
        (0..n).map(|_| TaskId::from_ulid(Ulid::new())).collect()
    }

    #[test]
    fn empty_pools_seed_at_one() {
        assert_eq!(top_of(Vec::<Rank>::new()), Rank::new(1));
        assert_eq!(bottom_of(Vec::<Rank>::new()), Rank::new(1));
    }

    #[rstest]
    #[case::dense(vec![1, 2, 3], 4, 0)]
    #[case::sparse(vec![-3, 10], 11, -4)]
    #[case::single(vec![7], 8, 6)]
    fn top_and_bottom_extend_the_pool(
        #[case] pool: Vec<i64>,
        #[case] expected_top: i64,
        #[case] expected_bottom: i64,
    ) {
        let pool: Vec<Rank> = pool.into_iter().map(Rank::new).collect();

        assert_eq!(top_of(pool.iter().copied()), Rank::new(expected_top));
        assert_eq!(bottom_of(pool.iter().copied()), Rank::new(expected_bottom));
    }

    #[test]
    fn redistribute_reverses_an_order() {
        let ids = ids(3);
        // current display: ids[2] (rank 9) above ids[1] (5) above ids[0] (2)
        let current = vec![Rank::new(2), Rank::new(5), Rank::new(9)];

        let assigned = redistribute(current, &ids);

        assert_eq!(assigned[0], (ids[0], Rank::new(9)));
        assert_eq!(assigned[1], (ids[1], Rank::new(5)));
        assert_eq!(assigned[2], (ids[2], Rank::new(2)));
    }

    #[test]
    fn redistribute_preserves_the_rank_set() {
        let ids = ids(4);
        let current = vec![Rank::new(4), Rank::new(-1), Rank::new(12), Rank::new(3)];
        let before: HashSet<Rank> = current.iter().copied().collect();

        let assigned = redistribute(current, &ids);
        let after: HashSet<Rank> = assigned.iter().map(|(_, r)| *r).collect();

        assert_eq!(before, after);
    }

    #[test]
    fn redistribute_is_a_no_op_when_the_order_already_matches() {
        let ids = ids(2);
        // ids[0] already on top
        let current = vec![Rank::new(8), Rank::new(2)];

        let assigned = redistribute(current, &ids);

        assert_eq!(assigned, vec![(ids[0], Rank::new(8)), (ids[1], Rank::new(2))]);
    }

    #[test]
    fn pool_collection_splits_today_from_backlog() {
        use crate::domain::phase::TaskPhase;
        use chrono::{NaiveDate, TimeZone, Utc};

        let now = Utc.with_ymd_and_hms(2024, 5, 20, 9, 0, 0).unwrap();
        let on = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let owner = Ulid::new().into();
        let mut tasks = Vec::new();
        for (i, phase) in [
            TaskPhase::Backlog { rank: Rank::new(1) },
            TaskPhase::Yesterday { on, rank: Rank::new(2) },
            TaskPhase::Today { on, rank: Rank::new(5) },
            TaskPhase::TodayDone { on },
        ]
        .into_iter()
        .enumerate()
        {
            let mut task = Task::new(
                TaskId::from_ulid(Ulid::new()),
                owner,
                None,
                format!("task {i}"),
                None,
                false,
                Rank::new(0),
                now,
            );
            task.transition(phase, now);
            tasks.push(task);
        }

        let pools = PoolRanks::collect(tasks.iter());

        // yesterday's unfinished entry shares the backlog pool
        assert_eq!(pools.backlog, vec![Rank::new(1), Rank::new(2)]);
        assert_eq!(pools.today, vec![Rank::new(5)]);
        assert_eq!(pools.today_top(), Rank::new(6));
        assert_eq!(pools.backlog_top(), Rank::new(3));
        assert_eq!(pools.today_bottom(), Rank::new(4));
    }
}
