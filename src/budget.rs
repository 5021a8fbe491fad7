//! Sample budget carried between the windows of one accounting interval.
//!
//! Each closed window contributes `target - samples`: positive when the window
//! sampled less than its share, negative when it took more. The budget is the
//! sum of the last `lookback` contributions and never outlives its interval,
//! so a quiet stretch cannot pay for a burst seconds later.
//!
//! When a whole interval is worth less than one sample, any sample taken is an
//! overspend no single interval can repay. Such accountants carry the overspend
//! (never any surplus) into the following intervals until it is paid back.

use crate::core::atomic::AtomicF64;

use std::sync::atomic::Ordering::*;
use std::sync::atomic::{AtomicU32, AtomicUsize};

/// Rolling per-interval budget.
/// Slots are allocated once at construction, never on the hot path.
#[derive(Debug)]
pub struct BudgetAccountant {
    slots: Box<[AtomicF64]>,
    cursor: AtomicUsize,
    filled: AtomicUsize,
    accumulated: AtomicF64,
    windows_since_interval_start: AtomicU32,
    carried: AtomicF64,
    carries_overspend: bool,
    floor: f64,
    ceiling: f64,
}

impl BudgetAccountant {
    /// Budget over the last `lookback` windows, for a per-window target of `target_per_window`.
    /// The floor keeps `target + budget` from going negative,
    /// the ceiling is what `lookback` idle windows would leave over.
    pub fn new(target_per_window: f64, lookback: u32) -> BudgetAccountant {
        let lookback = lookback.max(1);
        let slots: Vec<AtomicF64> = (0..lookback).map(|_| AtomicF64::new(0.0)).collect();
        BudgetAccountant {
            slots: slots.into_boxed_slice(),
            cursor: AtomicUsize::new(0),
            filled: AtomicUsize::new(0),
            accumulated: AtomicF64::new(0.0),
            windows_since_interval_start: AtomicU32::new(0),
            carried: AtomicF64::new(0.0),
            carries_overspend: false,
            floor: -target_per_window,
            ceiling: target_per_window * f64::from(lookback),
        }
    }

    /// Return an accountant keeping overspend across interval resets if `carry` holds.
    pub fn carrying_overspend(self, carry: bool) -> BudgetAccountant {
        BudgetAccountant { carries_overspend: carry, ..self }
    }

    /// True if overspend survives interval resets.
    pub fn carries_overspend(&self) -> bool {
        self.carries_overspend
    }

    /// Settle the interval about to be reset: the closing window took `sample_count`
    /// samples and `idle_windows` more windows of the interval went by without events.
    /// Whatever remains overspent is carried into the next interval, surplus is dropped.
    /// No-op unless carrying overspend.
    pub fn settle_interval(&self, sample_count: u64, idle_windows: u64, target_per_window: f64) {
        if !self.carries_overspend {
            return;
        }
        let balance = self.carried.load(Acquire)
            + self.exact_sum()
            + (target_per_window - sample_count as f64)
            + idle_windows as f64 * target_per_window;
        let debt = if balance.is_nan() { 0.0 } else { balance.min(0.0) };
        self.carried.store(debt, Release);
    }

    /// Overspend brought in from earlier intervals, zero or negative.
    pub fn carried(&self) -> f64 {
        self.carried.load(Acquire)
    }

    /// Fold a closed window into the budget, returning its contribution.
    pub fn accrue(&self, sample_count: u64, target_per_window: f64) -> f64 {
        let delta = target_per_window - sample_count as f64;
        self.push(delta);
        delta
    }

    /// Fold in windows that saw no event at all, each leaving its whole target unspent.
    /// Only the most recent `lookback` of them can matter.
    pub fn accrue_idle(&self, windows: u64, target_per_window: f64) {
        let windows = windows.min(self.slots.len() as u64);
        for _ in 0..windows {
            self.push(target_per_window);
        }
    }

    /// Forget everything but carried overspend when crossing into a new interval.
    /// Returns true if a reset happened.
    pub fn reset_if_new_interval(&self, closed_interval: u64, next_interval: u64) -> bool {
        if closed_interval == next_interval {
            return false;
        }
        self.cursor.store(0, Relaxed);
        self.filled.store(0, Relaxed);
        self.windows_since_interval_start.store(0, Release);
        self.accumulated.store(self.clamp(self.carried.load(Acquire)), Release);
        true
    }

    /// Record which window of the interval is now open.
    pub fn set_position(&self, windows_since_interval_start: u32) {
        self.windows_since_interval_start.store(windows_since_interval_start, Release);
    }

    /// Current budget, clamped to `[floor, ceiling]`.
    pub fn budget(&self) -> f64 {
        self.accumulated.load(Acquire)
    }

    /// Windows elapsed in the current interval.
    pub fn windows_since_interval_start(&self) -> u32 {
        self.windows_since_interval_start.load(Acquire)
    }

    fn push(&self, delta: f64) {
        let len = self.slots.len();
        let cursor = self.cursor.load(Relaxed);
        self.slots[cursor].store(delta, Relaxed);
        self.cursor.store((cursor + 1) % len, Relaxed);
        let filled = (self.filled.load(Relaxed) + 1).min(len);
        self.filled.store(filled, Relaxed);

        let sum = self.carried.load(Acquire) + self.exact_sum();
        self.accumulated.store(self.clamp(sum), Release);
    }

    /// Unclamped sum of the live slots.
    /// At most one slot per window of the interval, cheap enough to sum exactly.
    fn exact_sum(&self) -> f64 {
        let filled = self.filled.load(Relaxed);
        self.slots.iter().take(filled).map(|slot| slot.load(Relaxed)).sum()
    }

    fn clamp(&self, sum: f64) -> f64 {
        if sum.is_nan() {
            0.0
        } else {
            sum.max(self.floor).min(self.ceiling)
        }
    }
}
