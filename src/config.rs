//! Sampler setup parameters.

use crate::core::clock::{Clock, MonotonicClock};
use crate::core::error::Result;
use crate::sampler::AdaptiveSampler;

use num::ToPrimitive;
use std::f64;
use std::time::Duration;

/// Default window length: ten windows per second.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(100);

/// Default number of windows folded into the population estimate.
pub const DEFAULT_EMA_LOOKBACK: u32 = 25;

/// Parameters of an adaptive sampler.
/// Validation happens when the sampler is built, never later.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SamplerConfig {
    target_rate: f64,
    window: Duration,
    ema_lookback: u32,
    budget_lookback: Option<u32>,
    seed: Option<u64>,
}

impl SamplerConfig {
    /// Aim for `target_rate` samples per second.
    /// Rates that do not convert to a float are rejected when building.
    pub fn new<R: ToPrimitive>(target_rate: R) -> SamplerConfig {
        SamplerConfig {
            target_rate: target_rate.to_f64().unwrap_or(f64::NAN),
            window: DEFAULT_WINDOW,
            ema_lookback: DEFAULT_EMA_LOOKBACK,
            budget_lookback: None,
            seed: None,
        }
    }

    /// Return a copy using windows of the specified duration.
    /// Must be whole milliseconds tiling one second exactly.
    pub fn window(&self, window: Duration) -> SamplerConfig {
        SamplerConfig { window, ..*self }
    }

    /// Return a copy folding roughly `windows` past windows into the population estimate.
    pub fn ema_lookback(&self, windows: u32) -> SamplerConfig {
        SamplerConfig { ema_lookback: windows, ..*self }
    }

    /// Return a copy carrying budget over the last `windows` windows of an interval.
    /// Defaults to the whole interval.
    pub fn budget_lookback(&self, windows: u32) -> SamplerConfig {
        SamplerConfig { budget_lookback: Some(windows), ..*self }
    }

    /// Return a copy drawing random numbers from a fixed seed.
    pub fn seed(&self, seed: u64) -> SamplerConfig {
        SamplerConfig { seed: Some(seed), ..*self }
    }

    /// Target samples per second.
    pub fn get_target_rate(&self) -> f64 {
        self.target_rate
    }

    /// Window duration.
    pub fn get_window(&self) -> Duration {
        self.window
    }

    /// EMA lookback in windows.
    pub fn get_ema_lookback(&self) -> u32 {
        self.ema_lookback
    }

    /// Budget lookback in windows, if not the whole interval.
    pub fn get_budget_lookback(&self) -> Option<u32> {
        self.budget_lookback
    }

    /// Random seed, if fixed.
    pub fn get_seed(&self) -> Option<u64> {
        self.seed
    }

    /// Build a sampler reading the process monotonic clock.
    pub fn build(&self) -> Result<AdaptiveSampler> {
        self.build_with_clock(MonotonicClock)
    }

    /// Build a sampler reading the specified clock when `sample()` is called.
    pub fn build_with_clock<C: Clock>(&self, clock: C) -> Result<AdaptiveSampler<C>> {
        AdaptiveSampler::new(*self, clock)
    }
}

/// One-time setup of a sampler for one event category.
/// Rejects non-positive rates and windows that do not tile one second.
pub fn configure<R: ToPrimitive>(
    target_rate_per_second: R,
    window_millis: u64,
    ema_lookback: u32,
    budget_lookback: u32,
) -> Result<AdaptiveSampler> {
    SamplerConfig::new(target_rate_per_second)
        .window(Duration::from_millis(window_millis))
        .ema_lookback(ema_lookback)
        .budget_lookback(budget_lookback)
        .build()
}
