//! PCG32 random number generation for fast sampling.
//! State lives in a single atomic so that draws need neither thread locals nor locks,
//! keeping the generator usable from signal handlers.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::*;

const MULTIPLIER: u64 = 6364136223846793005;
const INCREMENT: u64 = 1442695040888963407;

/// One in 2^32, the resolution of a draw.
const SCALE: f64 = 4_294_967_296.0;

fn time_seed() -> u64 {
    let seed = 5573589319906701683_u64;
    let seed = seed
        .wrapping_mul(MULTIPLIER)
        .wrapping_add(INCREMENT)
        .wrapping_add(time::precise_time_ns());
    seed.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT)
}

#[inline]
fn step(state: u64) -> u64 {
    state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT)
}

#[inline]
fn output(state: u64) -> u32 {
    ((((state >> 18) ^ state) >> 27) as u32).rotate_right((state >> 59) as u32)
}

/// Lock-free PCG32 generator shared by all threads drawing from it.
#[derive(Debug)]
pub struct Pcg32 {
    state: AtomicU64,
}

impl Pcg32 {
    /// Seed from the high resolution system timer.
    pub fn new() -> Pcg32 {
        Pcg32::with_seed(time_seed())
    }

    /// Fixed seed, for reproducible sequences.
    pub fn with_seed(seed: u64) -> Pcg32 {
        Pcg32 {
            state: AtomicU64::new(step(seed.wrapping_add(INCREMENT))),
        }
    }

    /// Quickly return a random int.
    /// Concurrent callers retry the state swap but each gets a distinct draw.
    #[inline]
    pub fn next_u32(&self) -> u32 {
        let mut current = self.state.load(Relaxed);
        loop {
            match self.state.compare_exchange_weak(current, step(current), Relaxed, Relaxed) {
                Ok(previous) => return output(previous),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for Pcg32 {
    fn default() -> Self {
        Pcg32::new()
    }
}

/// Convert a floating point sampling probability to an integer threshold
/// so that a fast integer RNG can be used.
/// .    | probability | threshold   | percentage
/// ---- | ----------- | ----------- | ----
/// all  | 1.0         | 0x1_0000_0000 | 100%
/// none | 0.0         | 0x0         | 0%
/// Anything outside [0, 1] (including NaN) is clamped first.
pub fn to_threshold(probability: f64) -> u64 {
    if !(probability > 0.0) {
        0
    } else if probability >= 1.0 {
        SCALE as u64
    } else {
        (probability * SCALE) as u64
    }
}

/// Randomly select samples based on an int threshold.
#[inline]
pub fn accept_sample(random: u32, threshold: u64) -> bool {
    u64::from(random) < threshold
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let a = Pcg32::with_seed(42);
        let b = Pcg32::with_seed(42);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn thresholds_cover_the_extremes() {
        assert_eq!(to_threshold(0.0), 0);
        assert_eq!(to_threshold(-3.0), 0);
        assert_eq!(to_threshold(::std::f64::NAN), 0);
        assert_eq!(to_threshold(1.0), 1 << 32);
        assert_eq!(to_threshold(7.5), 1 << 32);
        assert_eq!(to_threshold(0.5), 1 << 31);

        assert!(accept_sample(u32::MAX, to_threshold(1.0)));
        assert!(!accept_sample(0, to_threshold(0.0)));
    }

    #[test]
    fn draws_are_roughly_uniform() {
        let rng = Pcg32::with_seed(7);
        let threshold = to_threshold(0.25);
        let hits = (0..100_000).filter(|_| accept_sample(rng.next_u32(), threshold)).count();
        assert!(hits > 24_000 && hits < 26_000, "hits {}", hits);
    }
}
