//! Quantized time windows tiling one second accounting intervals.

use crate::core::clock::Timestamp;
use crate::core::error::{ConfigError, Result};

use std::time::Duration;

const NANOS_PER_MILLI: u64 = 1_000_000;
const MILLIS_PER_INTERVAL: u64 = 1_000;

/// Maps timestamps to windows and windows to intervals.
/// Pure functions of time, no state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WindowTracker {
    duration_nanos: u64,
    windows_per_interval: u32,
}

impl WindowTracker {
    /// Windows must be whole milliseconds and tile one second exactly.
    pub fn new(window: Duration) -> Result<WindowTracker> {
        let nanos = Timestamp::from_duration(window).as_nanos();
        if nanos == 0 || nanos % NANOS_PER_MILLI != 0 {
            return Err(ConfigError::InvalidWindow(nanos));
        }
        let millis = nanos / NANOS_PER_MILLI;
        if MILLIS_PER_INTERVAL % millis != 0 {
            return Err(ConfigError::WindowNotDividingSecond(millis));
        }
        Ok(WindowTracker {
            duration_nanos: nanos,
            windows_per_interval: (MILLIS_PER_INTERVAL / millis) as u32,
        })
    }

    /// Length of one window.
    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.duration_nanos)
    }

    /// Length of one window in nanoseconds.
    pub fn duration_nanos(&self) -> u64 {
        self.duration_nanos
    }

    /// Length of one window as a fraction of a second.
    pub fn duration_secs(&self) -> f64 {
        self.duration_nanos as f64 / 1e9
    }

    /// How many windows make up one accounting interval.
    pub fn windows_per_interval(&self) -> u32 {
        self.windows_per_interval
    }

    /// `floor(t / window)`
    #[inline]
    pub fn index(&self, t: Timestamp) -> u64 {
        t.as_nanos() / self.duration_nanos
    }

    /// Start of the window containing `t`.
    #[inline]
    pub fn start_of(&self, t: Timestamp) -> Timestamp {
        Timestamp::from_nanos(self.index(t) * self.duration_nanos)
    }

    /// True when `t` falls into a later window than the one starting at `window_start`.
    /// Earlier timestamps never count as rolled.
    #[inline]
    pub fn has_rolled(&self, window_start: Timestamp, t: Timestamp) -> bool {
        self.index(t) > self.index(window_start)
    }

    /// Index of the one second interval containing `t`.
    #[inline]
    pub fn interval(&self, t: Timestamp) -> u64 {
        self.index(t) / u64::from(self.windows_per_interval)
    }

    /// Windows elapsed since the start of the interval containing `t`.
    #[inline]
    pub fn position(&self, t: Timestamp) -> u32 {
        (self.index(t) % u64::from(self.windows_per_interval)) as u32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tracker(millis: u64) -> WindowTracker {
        WindowTracker::new(Duration::from_millis(millis)).unwrap()
    }

    #[test]
    fn rejects_windows_not_tiling_a_second() {
        assert_eq!(WindowTracker::new(Duration::from_millis(0)), Err(ConfigError::InvalidWindow(0)));
        assert_eq!(
            WindowTracker::new(Duration::from_millis(300)),
            Err(ConfigError::WindowNotDividingSecond(300))
        );
        assert_eq!(
            WindowTracker::new(Duration::from_millis(2000)),
            Err(ConfigError::WindowNotDividingSecond(2000))
        );
        assert_eq!(
            WindowTracker::new(Duration::from_micros(1500)),
            Err(ConfigError::InvalidWindow(1_500_000))
        );
    }

    #[test]
    fn windows_per_interval() {
        assert_eq!(tracker(100).windows_per_interval(), 10);
        assert_eq!(tracker(1).windows_per_interval(), 1000);
        assert_eq!(tracker(1000).windows_per_interval(), 1);
        assert_eq!(tracker(40).duration_secs(), 0.04);
    }

    #[test]
    fn index_and_start() {
        let w = tracker(100);
        assert_eq!(w.index(Timestamp::from_millis(0)), 0);
        assert_eq!(w.index(Timestamp::from_millis(99)), 0);
        assert_eq!(w.index(Timestamp::from_millis(100)), 1);
        assert_eq!(w.start_of(Timestamp::from_millis(1234)), Timestamp::from_millis(1200));
    }

    #[test]
    fn rolled_only_forward() {
        let w = tracker(100);
        let start = Timestamp::from_millis(500);
        assert!(!w.has_rolled(start, Timestamp::from_millis(500)));
        assert!(!w.has_rolled(start, Timestamp::from_millis(599)));
        assert!(w.has_rolled(start, Timestamp::from_millis(600)));
        assert!(!w.has_rolled(start, Timestamp::from_millis(420)));
    }

    #[test]
    fn interval_and_position() {
        let w = tracker(100);
        assert_eq!(w.interval(Timestamp::from_millis(999)), 0);
        assert_eq!(w.interval(Timestamp::from_millis(1000)), 1);
        assert_eq!(w.position(Timestamp::from_millis(1000)), 0);
        assert_eq!(w.position(Timestamp::from_millis(2950)), 9);
    }
}
