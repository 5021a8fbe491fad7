//! One sampler per event category.
//! Lookups lock; grab the handle once at setup and keep it on the hot path.

use crate::config::SamplerConfig;
use crate::core::error::{ConfigError, Result};
use crate::sampler::{AdaptiveSampler, SamplerStats};
use crate::throttle::Throttle;

use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(not(feature = "parking_lot"))]
use std::sync::RwLock;

#[cfg(feature = "parking_lot")]
use parking_lot::RwLock;

lazy_static! {
    static ref DEFAULT_REGISTRY: SamplerRegistry = SamplerRegistry::new();
}

/// The process-wide registry.
pub fn default_registry() -> &'static SamplerRegistry {
    &DEFAULT_REGISTRY
}

/// Samplers keyed by event category name.
/// Clones share the same categories.
#[derive(Debug, Clone, Default)]
pub struct SamplerRegistry {
    inner: Arc<RwLock<BTreeMap<String, AdaptiveSampler>>>,
}

impl SamplerRegistry {
    /// Build an empty registry.
    pub fn new() -> SamplerRegistry {
        SamplerRegistry::default()
    }

    /// Build and register the sampler of a category.
    /// Fails if the category already has one or the configuration is invalid.
    pub fn register<S: Into<String>>(&self, category: S, config: &SamplerConfig) -> Result<AdaptiveSampler> {
        let category = category.into();
        let mut samplers = write_lock!(self.inner);
        if samplers.contains_key(&category) {
            return Err(ConfigError::AlreadyRegistered(category));
        }
        let sampler = config.build()?;
        info!(
            "Registered sampler for '{}' at {} samples/s",
            category,
            config.get_target_rate()
        );
        samplers.insert(category, sampler.clone());
        Ok(sampler)
    }

    /// Register from a rate setting such as `150/s`.
    /// `off` registers nothing and returns `None`: every event of the category is emitted.
    pub fn register_throttle<S: Into<String>>(&self, category: S, setting: &str) -> Result<Option<AdaptiveSampler>> {
        let category: String = category.into();
        let throttle: Throttle = setting.parse()?;
        match throttle.config() {
            Some(config) => self.register(category, &config).map(Some),
            None => {
                info!("Sampling disabled for '{}'", category);
                Ok(None)
            }
        }
    }

    /// The sampler of a category, if registered.
    pub fn get(&self, category: &str) -> Option<AdaptiveSampler> {
        read_lock!(self.inner).get(category).cloned()
    }

    /// Remove a category's sampler. Its state is dropped with the last outstanding handle.
    pub fn deregister(&self, category: &str) -> Option<AdaptiveSampler> {
        let removed = write_lock!(self.inner).remove(category);
        if removed.is_some() {
            info!("Deregistered sampler for '{}'", category);
        }
        removed
    }

    /// Registered categories, in name order.
    pub fn categories(&self) -> Vec<String> {
        read_lock!(self.inner).keys().cloned().collect()
    }

    /// Snapshot every registered sampler.
    pub fn stats(&self) -> BTreeMap<String, SamplerStats> {
        read_lock!(self.inner)
            .iter()
            .map(|(category, sampler)| (category.clone(), sampler.stats()))
            .collect()
    }

    /// Write a snapshot of every registered sampler to the log.
    pub fn log_stats(&self) {
        for (category, stats) in self.stats() {
            info!("{}: {}", category, stats)
        }
    }

    /// Sample an event of `category` at the current time, `None` if unregistered.
    /// Takes a read lock, prefer keeping the handle where it matters.
    pub fn sample(&self, category: &str) -> Option<bool> {
        self.get(category).map(|sampler| sampler.sample())
    }
}
