use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for services.
///
/// `Manual` clocks share their instant between clones, so a test can hand a
/// clone to a service and keep advancing time from the outside.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
    Manual(Arc<Mutex<DateTime<Utc>>>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// Returns a clock frozen at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns a clock starting at `start` that only moves through [`Clock::advance`].
    #[must_use]
    pub fn manual(start: DateTime<Utc>) -> Self {
        Self::Manual(Arc::new(Mutex::new(start)))
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
            Clock::Manual(shared) => *shared.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Move a manual clock forward. Every clone observes the new instant.
    ///
    /// Has no effect on system or fixed clocks.
    pub fn advance(&self, delta: Duration) {
        if let Clock::Manual(shared) = self {
            let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
            *guard += delta;
        }
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a manual clock starting at [`fixed_now`].
#[must_use]
pub fn test_clock() -> Clock {
    Clock::manual(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_across_clones() {
        let clock = test_clock();
        let handed_out = clock.clone();
        clock.advance(Duration::minutes(5));
        assert_eq!(handed_out.now(), fixed_now() + Duration::minutes(5));
    }

    #[test]
    fn fixed_clock_ignores_advance() {
        let clock = Clock::fixed(fixed_now());
        clock.advance(Duration::hours(1));
        assert_eq!(clock.now(), fixed_now());
    }
}
