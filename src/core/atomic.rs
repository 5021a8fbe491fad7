//! Fixed-size atomic cells for values std has no atomic for.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// An f64 stored as its bit pattern.
#[derive(Debug)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    /// New cell holding `value`.
    pub fn new(value: f64) -> AtomicF64 {
        AtomicF64 { bits: AtomicU64::new(value.to_bits()) }
    }

    /// Read the value.
    #[inline]
    pub fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.bits.load(order))
    }

    /// Replace the value.
    #[inline]
    pub fn store(&self, value: f64, order: Ordering) {
        self.bits.store(value.to_bits(), order)
    }
}

const SAMPLES_MASK: u64 = 0xFFFF_FFFF;

/// Population and sample counts of one window, packed in a single word
/// so that both move together: `samples <= population` holds for every reader.
#[derive(Debug, Default)]
pub struct AtomicCounts {
    packed: AtomicU64,
}

/// Counts read out of an `AtomicCounts`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Counts {
    /// Events observed.
    pub population: u32,
    /// Events admitted.
    pub samples: u32,
}

#[inline]
fn pack(counts: Counts) -> u64 {
    (u64::from(counts.population) << 32) | u64::from(counts.samples)
}

#[inline]
fn unpack(packed: u64) -> Counts {
    Counts {
        population: (packed >> 32) as u32,
        samples: (packed & SAMPLES_MASK) as u32,
    }
}

impl AtomicCounts {
    /// Count one event, admitting it only if `admit` holds and fewer than `limit`
    /// samples were taken so far. Returns whether the event was admitted.
    /// Population saturates instead of overflowing into the sample half.
    #[inline]
    pub fn record(&self, admit: bool, limit: u64) -> bool {
        let mut current = self.packed.load(Ordering::Relaxed);
        loop {
            let counts = unpack(current);
            if counts.population == u32::MAX {
                return false;
            }
            let admitted = admit && u64::from(counts.samples) < limit;
            let next = Counts {
                population: counts.population + 1,
                samples: counts.samples + admitted as u32,
            };
            match self.packed.compare_exchange_weak(current, pack(next), Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return admitted,
                Err(actual) => current = actual,
            }
        }
    }

    /// Reset to zero, returning the previous counts.
    #[inline]
    pub fn take(&self) -> Counts {
        unpack(self.packed.swap(0, Ordering::AcqRel))
    }

    /// Current counts.
    #[inline]
    pub fn load(&self) -> Counts {
        unpack(self.packed.load(Ordering::Acquire))
    }
}
