//! A fast lock-free adaptive sampler limiting how many events are emitted per second.
//!
//! Time is divided in short windows. Each window admits events with a fixed probability,
//! recomputed at every window boundary from an estimate of how many events the window will see
//! and from the samples left unspent (or overspent) by earlier windows of the same second.
//! Bursty or fluctuating arrivals thus still converge to the configured rate.
//!
//! Sampling decisions take no lock and never allocate, so they can be made from
//! signal handlers and other constrained contexts.
//!
//! ```
//! use trickle::{configure, Timestamp};
//!
//! let sampler = configure(150, 100, 25, 10).unwrap();
//! if sampler.should_sample(Timestamp::from_millis(42)) {
//!     // record the event
//! }
//! ```

#![cfg_attr(feature = "bench", feature(test))]
#![warn(
    missing_copy_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
)]

#[cfg(feature = "bench")]
extern crate test;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
mod macros;

pub mod core;

mod budget;
mod controller;
mod estimate;
mod window;

pub mod config;
pub mod registry;
pub mod sampler;
pub mod throttle;

pub use crate::core::clock::{Clock, MockClock, MonotonicClock, Timestamp};
pub use crate::core::error::{ConfigError, Result};
pub use crate::core::pcg32::Pcg32;

pub use crate::budget::BudgetAccountant;
pub use crate::controller::{next_probability, sample_limit, MIN_POPULATION_ESTIMATE};
pub use crate::estimate::PopulationEstimator;
pub use crate::window::WindowTracker;

pub use crate::config::{configure, SamplerConfig, DEFAULT_EMA_LOOKBACK, DEFAULT_WINDOW};
pub use crate::registry::{default_registry, SamplerRegistry};
pub use crate::sampler::{AdaptiveSampler, SamplerStats};
pub use crate::throttle::Throttle;
