//! Human readable rate settings, e.g. `150/s`, `20/ms`, `5/min` or `off`.

use crate::config::SamplerConfig;
use crate::core::error::{ConfigError, Result};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A parsed rate setting.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Throttle {
    /// Emit every event, no sampler needed.
    Off,

    /// At most `count` samples per `period`.
    Rate {
        /// Samples allowed per period.
        count: u64,
        /// Period the count applies to.
        period: Duration,
    },
}

fn unit_period(unit: &str) -> Option<Duration> {
    let period = match unit {
        "ns" => Duration::from_nanos(1),
        "us" => Duration::from_micros(1),
        "ms" => Duration::from_millis(1),
        "s" => Duration::from_secs(1),
        "m" | "min" => Duration::from_secs(60),
        "h" => Duration::from_secs(3600),
        "d" => Duration::from_secs(86_400),
        _ => return None,
    };
    Some(period)
}

fn unit_name(period: Duration) -> Option<&'static str> {
    ["ns", "us", "ms", "s", "m", "h", "d"]
        .iter()
        .cloned()
        .find(|unit| unit_period(unit) == Some(period))
}

impl Throttle {
    /// Samples per second this setting allows, `None` when off.
    pub fn samples_per_second(&self) -> Option<f64> {
        match *self {
            Throttle::Off => None,
            Throttle::Rate { count, period } => {
                let secs = period.as_secs() as f64 + f64::from(period.subsec_nanos()) / 1e9;
                Some(count as f64 / secs)
            }
        }
    }

    /// Sampler configuration with default windowing for this rate, `None` when off.
    pub fn config(&self) -> Option<SamplerConfig> {
        self.samples_per_second().map(SamplerConfig::new)
    }
}

impl FromStr for Throttle {
    type Err = ConfigError;

    fn from_str(setting: &str) -> Result<Throttle> {
        let trimmed = setting.trim();
        if trimmed.eq_ignore_ascii_case("off") {
            return Ok(Throttle::Off);
        }
        let invalid = || ConfigError::InvalidThrottle(setting.to_string());

        let mut parts = trimmed.splitn(2, '/');
        let count = parts.next().map(str::trim).ok_or_else(invalid)?;
        let unit = parts.next().map(str::trim).ok_or_else(invalid)?;

        let count: u64 = count.parse().map_err(|_| invalid())?;
        let period = unit_period(unit).ok_or_else(invalid)?;
        if count == 0 {
            return Err(ConfigError::InvalidRate(0.0));
        }
        Ok(Throttle::Rate { count, period })
    }
}

impl fmt::Display for Throttle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Throttle::Off => write!(f, "off"),
            Throttle::Rate { count, period } => match unit_name(period) {
                Some(unit) => write!(f, "{}/{}", count, unit),
                None => write!(f, "{}/{:?}", count, period),
            },
        }
    }
}
