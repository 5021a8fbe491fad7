//! Exponentially weighted estimate of how many events a window will see.

use crate::core::atomic::AtomicF64;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::*;

/// EWMA of closed window populations.
/// Only the thread currently rolling the window writes here;
/// atomics keep concurrent readers (stats) from seeing torn values.
#[derive(Debug)]
pub struct PopulationEstimator {
    alpha: f64,
    estimate: AtomicF64,
    seeded: AtomicBool,
}

impl PopulationEstimator {
    /// Smoothing factor `2 / (lookback + 1)`. A lookback of 1 tracks the last window only.
    pub fn new(lookback: u32) -> PopulationEstimator {
        PopulationEstimator {
            alpha: 2.0 / (f64::from(lookback.max(1)) + 1.0),
            estimate: AtomicF64::new(0.0),
            seeded: AtomicBool::new(false),
        }
    }

    /// Weight given to the newest window.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Fold in the population of a closed window.
    /// The first window ever closed seeds the estimate as is.
    pub fn update(&self, population: u64) -> f64 {
        let observed = population as f64;
        let next = if self.seeded.swap(true, AcqRel) {
            self.alpha * observed + (1.0 - self.alpha) * self.estimate.load(Acquire)
        } else {
            observed
        };
        self.store(next)
    }

    /// Fold in `windows` consecutive empty windows at once.
    pub fn decay(&self, windows: u64) -> f64 {
        if windows == 0 || !self.seeded.load(Acquire) {
            return self.estimate();
        }
        let exponent = windows.min(i32::MAX as u64) as i32;
        let next = self.estimate.load(Acquire) * (1.0 - self.alpha).powi(exponent);
        self.store(next)
    }

    /// Latest estimate, zero until the first window closes.
    pub fn estimate(&self) -> f64 {
        self.estimate.load(Acquire)
    }

    fn store(&self, next: f64) -> f64 {
        let next = if next.is_finite() && next > 0.0 { next } else { 0.0 };
        self.estimate.store(next, Release);
        next
    }
}
