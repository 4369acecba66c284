//! Time source and correlation-ID generation

use std::time::Instant;

/// Monotonic time source used to measure processing time
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Generator for per-call session identifiers
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs prefixed with `fraud_`
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        format!("fraud_{}", uuid::Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let ids = UuidGenerator;
        let first = ids.next_id();
        let second = ids.next_id();

        assert!(first.starts_with("fraud_"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let clock = MonotonicClock;
        let earlier = clock.now();
        assert!(clock.now() >= earlier);
    }
}
