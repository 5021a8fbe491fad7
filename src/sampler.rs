//! The adaptive sampler: decides, one event at a time, whether it gets emitted.
//!
//! Time is cut in fixed windows tiling one second intervals. Each window holds a
//! single admission probability, recomputed when the window rolls over from the
//! estimated event population and the sample budget left by the interval's
//! previous windows. The first caller to observe a window boundary performs the
//! rollover; everybody else keeps sampling without waiting.
//!
//! The hot path (`should_sample`) takes no lock, allocates nothing and never
//! blocks, so it may be called from signal handlers.

use crate::budget::BudgetAccountant;
use crate::config::SamplerConfig;
use crate::controller::{next_probability, sample_limit};
use crate::core::atomic::{AtomicCounts, AtomicF64};
use crate::core::clock::{Clock, MonotonicClock, Timestamp};
use crate::core::error::{ConfigError, Result};
use crate::core::pcg32::{self, Pcg32};
use crate::estimate::PopulationEstimator;
use crate::window::WindowTracker;

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::*;
use std::sync::Arc;

/// Marks the window start while a rollover is in progress.
const ROLLING: u64 = 1 << 63;

/// No event seen yet. Not a multiple of any whole millisecond window.
const UNOPENED: u64 = ROLLING - 1;

/// Shared state of one event category's sampler.
#[derive(Debug)]
struct SamplerState {
    config: SamplerConfig,
    window: WindowTracker,
    target_per_window: f64,

    window_start: AtomicU64,
    counts: AtomicCounts,
    probability: AtomicF64,
    threshold: AtomicU64,
    sample_limit: AtomicU64,

    estimator: PopulationEstimator,
    budget: BudgetAccountant,
    random: Pcg32,

    closed_windows: AtomicU64,
    closed_population: AtomicU64,
    closed_samples: AtomicU64,
}

impl SamplerState {
    fn new(config: SamplerConfig) -> Result<SamplerState> {
        let rate = config.get_target_rate();
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ConfigError::InvalidRate(rate));
        }
        let window = WindowTracker::new(config.get_window())?;
        if config.get_ema_lookback() == 0 {
            return Err(ConfigError::InvalidEmaLookback(0));
        }
        let windows_per_interval = window.windows_per_interval();
        let budget_lookback = config.get_budget_lookback().unwrap_or(windows_per_interval);
        if budget_lookback == 0 || budget_lookback > windows_per_interval {
            return Err(ConfigError::InvalidBudgetLookback {
                lookback: budget_lookback,
                windows_per_interval,
            });
        }

        let target_per_window = rate * window.duration_nanos() as f64 / 1e9;
        let random = match config.get_seed() {
            Some(seed) => Pcg32::with_seed(seed),
            None => Pcg32::new(),
        };

        Ok(SamplerState {
            window,
            target_per_window,
            window_start: AtomicU64::new(UNOPENED),
            counts: AtomicCounts::default(),
            probability: AtomicF64::new(1.0),
            threshold: AtomicU64::new(pcg32::to_threshold(1.0)),
            sample_limit: AtomicU64::new(sample_limit(target_per_window, 0.0)),
            estimator: PopulationEstimator::new(config.get_ema_lookback()),
            budget: BudgetAccountant::new(target_per_window, budget_lookback)
                .carrying_overspend(target_per_window * f64::from(windows_per_interval) < 1.0),
            random,
            closed_windows: AtomicU64::new(0),
            closed_population: AtomicU64::new(0),
            closed_samples: AtomicU64::new(0),
            config,
        })
    }

    /// Roll the window over if `now` is past it, unless someone else already is.
    #[inline]
    fn maybe_roll(&self, now: Timestamp) {
        let current = self.window_start.load(Acquire);
        if current != UNOPENED
            && (current & ROLLING != 0 || !self.window.has_rolled(Timestamp::from_nanos(current), now))
        {
            return;
        }
        let next = self.window.start_of(now);
        if next.as_nanos() & ROLLING != 0 {
            // no room for the rolling mark, keep sampling in the open window
            return;
        }
        if self
            .window_start
            .compare_exchange(current, next.as_nanos() | ROLLING, AcqRel, Acquire)
            .is_err()
        {
            // lost the race, the winner rolls
            return;
        }
        if current == UNOPENED {
            self.budget.set_position(self.window.position(next));
        } else {
            self.roll(Timestamp::from_nanos(current), next);
        }
        self.window_start.store(next.as_nanos(), Release);
    }

    /// Close the window starting at `closed_start` and open the one starting at `next`.
    /// Only ever run by the thread that won the window start swap.
    /// Crossing into a new interval resets the budget instead of accruing the closed window,
    /// except for overspend carried by sub-sample intervals.
    fn roll(&self, closed_start: Timestamp, next: Timestamp) {
        let closed = self.counts.take();
        self.closed_windows.fetch_add(1, Relaxed);
        self.closed_population.fetch_add(u64::from(closed.population), Relaxed);
        self.closed_samples.fetch_add(u64::from(closed.samples), Relaxed);

        let skipped = self.window.index(next) - self.window.index(closed_start) - 1;
        self.estimator.update(u64::from(closed.population));
        let estimate = self.estimator.decay(skipped);

        let target = self.target_per_window;
        let closed_interval = self.window.interval(closed_start);
        let next_interval = self.window.interval(next);
        if closed_interval != next_interval {
            let next_interval_first = next_interval * u64::from(self.window.windows_per_interval());
            let idle = next_interval_first - self.window.index(closed_start) - 1;
            self.budget.settle_interval(u64::from(closed.samples), idle, target);
        }
        if self.budget.reset_if_new_interval(closed_interval, next_interval) {
            // the closed window's balance belongs to the finished interval
            self.budget.accrue_idle(u64::from(self.window.position(next)), target);
        } else {
            self.budget.accrue(u64::from(closed.samples), target);
            self.budget.accrue_idle(skipped, target);
        }
        self.budget.set_position(self.window.position(next));

        let budget = self.budget.budget();
        self.publish(next_probability(target, estimate, budget), sample_limit(target, budget));
    }

    fn publish(&self, probability: f64, limit: u64) {
        self.probability.store(probability, Release);
        self.threshold.store(pcg32::to_threshold(probability), Release);
        self.sample_limit.store(limit, Release);
    }

    /// Count the event in the open window and run the probability test.
    #[inline]
    fn test(&self) -> bool {
        let threshold = self.threshold.load(Acquire);
        let admit = threshold != 0 && pcg32::accept_sample(self.random.next_u32(), threshold);
        self.counts.record(admit, self.sample_limit.load(Acquire))
    }
}

/// Handle on one event category's sampler.
/// Clones share the same state; the state goes away with the last handle.
#[derive(Debug, Clone)]
pub struct AdaptiveSampler<C = MonotonicClock> {
    inner: Arc<SamplerState>,
    clock: C,
}

impl<C: Clock> AdaptiveSampler<C> {
    pub(crate) fn new(config: SamplerConfig, clock: C) -> Result<AdaptiveSampler<C>> {
        match SamplerState::new(config) {
            Ok(state) => {
                debug!(
                    "Sampler configured: {} samples/s over {} windows of {:?}, {} per window, ema lookback {}, budget lookback {}",
                    state.config.get_target_rate(),
                    state.window.windows_per_interval(),
                    state.window.duration(),
                    state.target_per_window,
                    state.config.get_ema_lookback(),
                    state.config.get_budget_lookback().unwrap_or_else(|| state.window.windows_per_interval()),
                );
                Ok(AdaptiveSampler { inner: Arc::new(state), clock })
            }
            Err(err) => {
                debug!("Rejected sampler configuration: {}", err);
                Err(err)
            }
        }
    }

    /// Decide whether the event happening at `now` should be emitted.
    /// Rolls the window over first if `now` lies past it.
    /// Bounded time, no locks, no allocation.
    #[inline]
    pub fn should_sample(&self, now: Timestamp) -> bool {
        self.inner.maybe_roll(now);
        self.inner.test()
    }

    /// Decide whether an event happening right now should be emitted, reading the sampler's clock.
    #[inline]
    pub fn sample(&self) -> bool {
        self.should_sample(self.clock.now())
    }

    /// Probability applied to events of the open window.
    pub fn probability(&self) -> f64 {
        self.inner.probability.load(Acquire)
    }

    /// Samples the configured rate allows in one window.
    pub fn target_per_window(&self) -> f64 {
        self.inner.target_per_window
    }

    /// Window layout.
    pub fn window(&self) -> &WindowTracker {
        &self.inner.window
    }

    /// The configuration this sampler was built from.
    pub fn config(&self) -> &SamplerConfig {
        &self.inner.config
    }

    /// The clock read by `sample()`.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Point-in-time view of the sampler.
    /// Fields are read one by one and may be slightly out of step while other threads sample.
    pub fn stats(&self) -> SamplerStats {
        let state = &*self.inner;
        let start = state.window_start.load(Acquire);
        let counts = state.counts.load();
        let population = u64::from(counts.population);
        let samples = u64::from(counts.samples);
        SamplerStats {
            window_start: if start == UNOPENED {
                None
            } else {
                Some(Timestamp::from_nanos(start & !ROLLING))
            },
            population,
            samples,
            probability: state.probability.load(Acquire),
            sample_limit: state.sample_limit.load(Acquire),
            population_estimate: state.estimator.estimate(),
            budget: state.budget.budget(),
            windows_since_interval_start: state.budget.windows_since_interval_start(),
            closed_windows: state.closed_windows.load(Relaxed),
            total_population: state.closed_population.load(Relaxed) + population,
            total_samples: state.closed_samples.load(Relaxed) + samples,
        }
    }
}

/// Snapshot of a sampler's state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SamplerStats {
    /// Start of the open window, `None` until the first event.
    pub window_start: Option<Timestamp>,
    /// Events seen in the open window.
    pub population: u64,
    /// Events admitted in the open window.
    pub samples: u64,
    /// Admission probability of the open window.
    pub probability: f64,
    /// Most samples the open window may admit.
    pub sample_limit: u64,
    /// Expected events per window.
    pub population_estimate: f64,
    /// Unspent (positive) or overspent (negative) samples carried in the interval.
    pub budget: f64,
    /// Position of the open window in its interval.
    pub windows_since_interval_start: u32,
    /// Windows closed so far.
    pub closed_windows: u64,
    /// Events seen since creation.
    pub total_population: u64,
    /// Events admitted since creation.
    pub total_samples: u64,
}

impl fmt::Display for SamplerStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "window {} ({}/{} sampled, limit {}), p={:.4}, est={:.1}, budget={:.1}, total {}/{} over {} windows",
            self.windows_since_interval_start,
            self.samples,
            self.population,
            self.sample_limit,
            self.probability,
            self.population_estimate,
            self.budget,
            self.total_samples,
            self.total_population,
            self.closed_windows,
        )
    }
}

#[cfg(feature = "bench")]
mod bench {

    use crate::config::SamplerConfig;
    use crate::core::clock::{MockClock, Timestamp};

    #[bench]
    fn sample_same_window(b: &mut test::Bencher) {
        let sampler = SamplerConfig::new(1000).build_with_clock(MockClock::default()).unwrap();
        b.iter(|| test::black_box(sampler.sample()));
    }

    #[bench]
    fn sample_rolling_every_call(b: &mut test::Bencher) {
        let sampler = SamplerConfig::new(1000).build().unwrap();
        let mut now = 0;
        b.iter(|| {
            now += 100_000_000;
            test::black_box(sampler.should_sample(Timestamp::from_nanos(now)))
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::clock::MockClock;
    use std::time::Duration;

    fn at(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn sampler(rate: u32, budget_lookback: u32) -> AdaptiveSampler<MockClock> {
        SamplerConfig::new(rate)
            .ema_lookback(5)
            .budget_lookback(budget_lookback)
            .seed(0x5eed)
            .build_with_clock(MockClock::default())
            .unwrap()
    }

    /// Feed `count` events spread evenly over the 100ms window starting at `start`.
    fn feed_window(sampler: &AdaptiveSampler<MockClock>, start: u64, count: u64) -> u64 {
        let step = 100_000_000 / count.max(1);
        (0..count)
            .filter(|i| sampler.should_sample(Timestamp::from_nanos(start * 1_000_000 + i * step)))
            .count() as u64
    }

    #[test]
    fn first_window_admits_up_to_target() {
        let sampler = sampler(150, 10);
        assert_eq!(sampler.stats().window_start, None);
        assert_eq!(feed_window(&sampler, 0, 100), 15);
        let stats = sampler.stats();
        assert_eq!(stats.window_start, Some(at(0)));
        assert_eq!(stats.population, 100);
        assert_eq!(stats.samples, 15);
        assert_eq!(stats.probability, 1.0);
    }

    #[test]
    fn rollover_seeds_estimate_and_probability() {
        let sampler = sampler(150, 10);
        feed_window(&sampler, 0, 100);
        sampler.should_sample(at(100));
        let stats = sampler.stats();
        assert_eq!(stats.closed_windows, 1);
        assert_eq!(stats.population_estimate, 100.0);
        assert_eq!(stats.budget, 0.0);
        assert_eq!(stats.probability, 0.15);
        assert_eq!(stats.sample_limit, 15);
        assert_eq!(stats.windows_since_interval_start, 1);
    }

    #[test]
    fn same_window_never_rolls() {
        let sampler = sampler(150, 10);
        feed_window(&sampler, 0, 100);
        sampler.should_sample(at(150));
        let before = sampler.stats();
        for ms in 150..200 {
            sampler.should_sample(at(ms));
        }
        let after = sampler.stats();
        assert_eq!(after.window_start, before.window_start);
        assert_eq!(after.probability, before.probability);
        assert_eq!(after.closed_windows, before.closed_windows);
        assert_eq!(after.population, before.population + 50);
    }

    #[test]
    fn late_events_land_in_open_window() {
        let sampler = sampler(150, 10);
        sampler.should_sample(at(500));
        sampler.should_sample(at(120));
        let stats = sampler.stats();
        assert_eq!(stats.window_start, Some(at(500)));
        assert_eq!(stats.population, 2);
        assert_eq!(stats.closed_windows, 0);
    }

    #[test]
    fn samples_never_exceed_population() {
        let sampler = sampler(5000, 10);
        for w in 0..30 {
            feed_window(&sampler, w * 100, 40 + (w * 37) % 300);
            let stats = sampler.stats();
            assert!(stats.samples <= stats.population);
            assert!(stats.probability >= 0.0 && stats.probability <= 1.0);
        }
        let stats = sampler.stats();
        assert!(stats.total_samples <= stats.total_population);
    }

    #[test]
    fn idle_windows_restore_full_probability() {
        let sampler = sampler(150, 10);
        for w in 0..10 {
            feed_window(&sampler, w * 100, 1000);
        }
        assert!(sampler.probability() < 0.1);

        // one lonely event every two seconds
        for s in 1..6 {
            sampler.should_sample(at(1000 + s * 2000));
            let p = sampler.probability();
            assert!(!p.is_nan());
            assert!(p >= 0.0 && p <= 1.0);
        }
        assert_eq!(sampler.probability(), 1.0);
        assert!(sampler.stats().population_estimate < 1.0);
    }

    #[test]
    fn sample_reads_own_clock() {
        let sampler = sampler(150, 10);
        let clock = sampler.clock().clone();
        for _ in 0..100 {
            sampler.sample();
        }
        clock.advance(Duration::from_millis(100));
        sampler.sample();
        let stats = sampler.stats();
        assert_eq!(stats.window_start, Some(at(100)));
        assert_eq!(stats.closed_windows, 1);
        assert_eq!(stats.total_population, 101);
    }

    #[test]
    fn concurrent_callers_keep_counts_consistent() {
        use std::thread;

        let sampler = SamplerConfig::new(1000).seed(11).build().unwrap();
        let threads: Vec<_> = (0..4u64)
            .map(|t| {
                let sampler = sampler.clone();
                thread::spawn(move || {
                    let mut admitted = 0u64;
                    for i in 0..20_000u64 {
                        // 10 events per millisecond spread over 2 seconds
                        let now = Timestamp::from_nanos((i * 100_000) + t);
                        if sampler.should_sample(now) {
                            admitted += 1;
                        }
                    }
                    admitted
                })
            })
            .collect();
        let admitted: u64 = threads.into_iter().map(|t| t.join().unwrap()).sum();

        let stats = sampler.stats();
        assert_eq!(stats.total_population, 80_000);
        assert_eq!(stats.total_samples, admitted);
        assert!(stats.total_samples <= stats.total_population);
        assert!(stats.closed_windows <= 20);
    }

    #[test]
    fn sub_sample_interval_carries_overspend() {
        let sampler = SamplerConfig::new(0.5).seed(3).build_with_clock(MockClock::default()).unwrap();
        assert!(sampler.should_sample(at(0)));
        assert!(!sampler.should_sample(at(1_000)));
        let stats = sampler.stats();
        assert_eq!(stats.budget, -0.05);
        assert_eq!(stats.sample_limit, 0);

        // paid back after another silent second
        assert!(sampler.should_sample(at(2_000)));
    }

    #[test]
    fn stats_render_on_one_line() {
        let sampler = sampler(150, 10);
        feed_window(&sampler, 0, 10);
        let line = sampler.stats().to_string();
        assert!(line.starts_with("window 0 (10/10 sampled, limit 15), p=1.0000"));
        assert!(!line.contains('\n'));
    }
}
