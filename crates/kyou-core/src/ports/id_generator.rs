//! IdGenerator port - ID 生成の抽象化。

use ulid::Ulid;

use crate::domain::{CategoryId, CompletionId, TaskId, UserId};

use super::clock::Clock;

/// Issues fresh identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate_user_id(&self) -> UserId;
    fn generate_task_id(&self) -> TaskId;
    fn generate_category_id(&self) -> CategoryId;
    fn generate_completion_id(&self) -> CompletionId;
}

/// ULID-based generator.
///
/// The timestamp half comes from the injected clock, so with a `FixedClock`
/// the sortable portion of generated IDs is deterministic; only the random
/// half varies.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next(&self) -> Ulid {
        let millis = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(millis, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_user_id(&self) -> UserId {
        self.next().into()
    }

    fn generate_task_id(&self) -> TaskId {
        self.next().into()
    }

    fn generate_category_id(&self) -> CategoryId {
        self.next().into()
    }

    fn generate_completion_id(&self) -> CompletionId {
        self.next().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::clock::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn generated_ids_embed_the_clock_timestamp() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        let ids = UlidGenerator::new(FixedClock::new(instant));

        let task = ids.generate_task_id();

        assert_eq!(
            task.as_ulid().timestamp_ms(),
            instant.timestamp_millis() as u64
        );
    }

    #[test]
    fn successive_ids_differ() {
        let ids = UlidGenerator::new(SystemClock);

        assert_ne!(ids.generate_task_id(), ids.generate_task_id());
    }
}
