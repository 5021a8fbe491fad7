//! Setup errors.
//! Sampling itself never fails, only configuration can.

use std::error;
use std::fmt;
use std::result;

/// Reasons a sampler could not be configured.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Target rate was zero, negative, not finite or not a number at all.
    InvalidRate(f64),
    /// Window duration was zero or not expressed in whole milliseconds.
    InvalidWindow(u64),
    /// Window duration (millis) does not tile one second exactly.
    WindowNotDividingSecond(u64),
    /// The population estimate needs at least one window of history.
    InvalidEmaLookback(u32),
    /// Budget lookback must lie within `1..=windows_per_interval`.
    InvalidBudgetLookback {
        /// Requested lookback.
        lookback: u32,
        /// Windows in one accounting interval.
        windows_per_interval: u32,
    },
    /// Rate setting string could not be parsed.
    InvalidThrottle(String),
    /// A sampler is already registered for this event category.
    AlreadyRegistered(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::InvalidRate(rate) => {
                write!(f, "target rate must be a positive number of samples per second, got {}", rate)
            }
            ConfigError::InvalidWindow(nanos) => {
                write!(f, "window duration must be a positive whole number of milliseconds, got {}ns", nanos)
            }
            ConfigError::WindowNotDividingSecond(millis) => {
                write!(f, "window duration of {}ms does not evenly divide one second", millis)
            }
            ConfigError::InvalidEmaLookback(k) => write!(f, "EMA lookback must be at least 1, got {}", k),
            ConfigError::InvalidBudgetLookback { lookback, windows_per_interval } => write!(
                f,
                "budget lookback must be between 1 and {} windows, got {}",
                windows_per_interval, lookback
            ),
            ConfigError::InvalidThrottle(setting) => write!(f, "invalid throttle setting '{}'", setting),
            ConfigError::AlreadyRegistered(category) => {
                write!(f, "a sampler is already registered for category '{}'", category)
            }
        }
    }
}

impl error::Error for ConfigError {}

/// Result of any setup operation.
pub type Result<T> = result::Result<T, ConfigError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_names_the_culprit() {
        let err = ConfigError::WindowNotDividingSecond(300);
        assert_eq!(err.to_string(), "window duration of 300ms does not evenly divide one second");

        let err = ConfigError::InvalidBudgetLookback { lookback: 12, windows_per_interval: 10 };
        assert!(err.to_string().contains("between 1 and 10"));
    }

    #[test]
    fn boxes_as_std_error() {
        let boxed: Box<dyn error::Error + Send + Sync> = Box::new(ConfigError::InvalidEmaLookback(0));
        assert_eq!(boxed.to_string(), "EMA lookback must be at least 1, got 0");
    }
}
