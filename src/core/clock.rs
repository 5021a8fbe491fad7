//! Monotonic timestamps and the clocks producing them.

use std::ops::Add;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

lazy_static! {
    static ref EPOCH: Instant = Instant::now();
}

const NANOS_PER_MILLI: u64 = 1_000_000;

/// A point on a monotonic timeline, in nanoseconds since the clock's epoch.
/// Plain integer so that it fits an atomic and can cross signal handler boundaries.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Wrap a raw nanosecond count.
    pub const fn from_nanos(nanos: u64) -> Timestamp {
        Timestamp(nanos)
    }

    /// Millisecond shorthand, mostly useful in tests.
    pub const fn from_millis(millis: u64) -> Timestamp {
        Timestamp(millis * NANOS_PER_MILLI)
    }

    /// Saturates past ~584 years.
    pub fn from_duration(since_epoch: Duration) -> Timestamp {
        let nanos = since_epoch.as_secs()
            .saturating_mul(1_000_000_000)
            .saturating_add(u64::from(since_epoch.subsec_nanos()));
        Timestamp(nanos)
    }

    /// Nanoseconds since epoch.
    pub fn as_nanos(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, period: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(Timestamp::from_duration(period).0))
    }
}

/// Source of monotonic time supplied by the hosting runtime.
pub trait Clock: Send + Sync {
    /// Current time. Must never go backwards for a given thread.
    fn now(&self) -> Timestamp;
}

/// Process-wide monotonic clock, anchored on the first time any clock was read.
#[derive(Debug, Copy, Clone, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_duration(EPOCH.elapsed())
    }
}

/// A manually driven clock.
/// Enables writing reproducible sampling tests in combination with `advance()`.
/// Clones share the same time, so a handle can be kept by the test
/// while the sampler holds another.
/// Not feature-gated so it stays visible to outside crates but should not be used outside of tests.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    nanos: Arc<AtomicU64>,
}

impl MockClock {
    /// Start a mock clock at the specified time.
    pub fn starting_at(start: Timestamp) -> MockClock {
        MockClock {
            nanos: Arc::new(AtomicU64::new(start.as_nanos())),
        }
    }

    /// Advance the mock clock by a certain amount of time.
    pub fn advance(&self, period: Duration) {
        let step = Timestamp::from_duration(period).as_nanos();
        self.nanos.fetch_add(step, AcqRel);
    }

    /// Jump to an absolute time. Moving backwards is allowed, to simulate late readers.
    pub fn set(&self, now: Timestamp) {
        self.nanos.store(now.as_nanos(), Release);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.nanos.load(Acquire))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mock_clock_is_shared_by_clones() {
        let clock = MockClock::starting_at(Timestamp::from_millis(5));
        let other = clock.clone();
        clock.advance(Duration::from_millis(95));
        assert_eq!(other.now(), Timestamp::from_millis(100));
        other.set(Timestamp::from_nanos(7));
        assert_eq!(clock.now().as_nanos(), 7);
    }

    #[test]
    fn monotonic_clock_never_goes_back() {
        let clock = MonotonicClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn timestamp_arithmetic() {
        let t = Timestamp::from_millis(1_000) + Duration::new(1, 500);
        assert_eq!(t.as_nanos(), 2_000_000_500);
        assert_eq!(Timestamp::from_duration(Duration::from_secs(u64::MAX)).as_nanos(), u64::MAX);
    }
}
