//! Injectable wall-clock source.
//!
//! The lock manager, the migration runner, and the queue subscription all
//! compare timestamps against "now." None of them call `Utc::now()`
//! directly; they go through a [`TimeSource`] so that lease-expiry and
//! lock-validity tests can advance time deterministically instead of
//! sleeping in real time.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// A source of the current wall-clock time.
pub trait TimeSource: Send + Sync + std::fmt::Debug {
    /// The current UTC time, as observed by this source.
    fn now(&self) -> DateTime<Utc>;
}

/// The default time source: the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A time source whose value is set explicitly, for deterministic tests of
/// lease expiry and lock validity.
#[derive(Debug, Clone)]
pub struct FixedTimeSource {
    micros: Arc<AtomicI64>,
}

impl FixedTimeSource {
    /// Create a fixed time source starting at `initial`.
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            micros: Arc::new(AtomicI64::new(
                initial.timestamp_micros(),
            )),
        }
    }

    /// Create a fixed time source starting at the current system time.
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Advance the clock by `duration`. Subsequent `now()` calls observe the
    /// new value, including through any clones sharing this source.
    pub fn advance(&self, duration: chrono::Duration) {
        self.micros
            .fetch_add(duration.num_microseconds().unwrap_or(0), Ordering::SeqCst);
    }

    /// Set the clock to an explicit instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.micros
            .store(instant.timestamp_micros(), Ordering::SeqCst);
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.micros.load(Ordering::SeqCst))
            .expect("stored timestamp is always valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_time_source_advances() {
        let t0 = Utc::now();
        let source = FixedTimeSource::new(t0);
        assert_eq!(source.now(), t0);

        source.advance(chrono::Duration::seconds(5));
        assert_eq!(source.now(), t0 + chrono::Duration::seconds(5));
    }

    #[test]
    fn fixed_time_source_shared_across_clones() {
        let source = FixedTimeSource::now();
        let clone = source.clone();
        clone.advance(chrono::Duration::minutes(1));
        assert_eq!(source.now(), clone.now());
    }

    #[test]
    fn system_time_source_moves_forward() {
        let source = SystemTimeSource;
        let a = source.now();
        let b = source.now();
        assert!(b >= a);
    }
}
