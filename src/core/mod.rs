//! Time, randomness, atomics and errors shared by the sampling machinery.

pub mod atomic;
pub mod clock;
pub mod error;
pub mod pcg32;

#[cfg(feature = "bench")]
pub mod bench {

    use super::clock::*;
    use super::pcg32::*;

    #[bench]
    fn get_timestamp(b: &mut test::Bencher) {
        let clock = MonotonicClock;
        b.iter(|| test::black_box(clock.now()));
    }

    #[bench]
    fn draw_random(b: &mut test::Bencher) {
        let rng = Pcg32::new();
        b.iter(|| test::black_box(rng.next_u32()));
    }
}
