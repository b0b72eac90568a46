//! Cache Configuration

use crate::storage::wheel::{wheel_slots, MAX_WHEEL_SLOTS, MIN_TICK};
use std::time::Duration;
use thiserror::Error;

/// Shard count used when none (or zero) is requested.
pub const DEFAULT_SHARD_COUNT: usize = 256;

/// Default interval between timing wheel ticks.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Default span covered by one rotation of the timing wheel.
pub const DEFAULT_HORIZON: Duration = Duration::from_secs(3600);

/// Configuration for a [`Cache`](crate::storage::Cache).
///
/// ```
/// use blitzcache::storage::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig {
///     shard_count: 16,
///     tick_duration: Duration::from_millis(10),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Number of independently locked shards (0 = default)
    pub shard_count: usize,

    /// Resolution of active expiry (default: 100ms)
    pub tick_duration: Duration,

    /// Longest TTL scheduled exactly; longer ones are clamped (default: 1h)
    pub wheel_horizon: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            tick_duration: DEFAULT_TICK,
            wheel_horizon: DEFAULT_HORIZON,
        }
    }
}

impl CacheConfig {
    /// Shard count with the zero fallback applied.
    pub fn effective_shard_count(&self) -> usize {
        if self.shard_count == 0 {
            DEFAULT_SHARD_COUNT
        } else {
            self.shard_count
        }
    }

    /// Checks that the timing wheel can be built from this configuration.
    ///
    /// The tick must be at least [`MIN_TICK`], and `horizon / tick` must lie
    /// between two slots and [`MAX_WHEEL_SLOTS`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        wheel_slots(self.tick_duration, self.wheel_horizon).map(|_| ())
    }

    /// Number of timing wheel slots this configuration produces.
    pub fn wheel_slots(&self) -> Result<usize, ConfigError> {
        wheel_slots(self.tick_duration, self.wheel_horizon)
    }
}

/// Errors from an invalid [`CacheConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tick duration must be greater than zero")]
    ZeroTick,

    #[error("tick duration {tick:?} is below the minimum of {min:?}")]
    TickTooSmall { tick: Duration, min: Duration },

    #[error("wheel horizon {horizon:?} must span at least two ticks of {tick:?}")]
    HorizonTooShort { horizon: Duration, tick: Duration },

    #[error("wheel would need {slots} slots (max: {max}); use a longer tick or a shorter horizon")]
    TooManySlots { slots: u128, max: usize },

    #[error("no Tokio runtime is running to drive the expiry task")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_shard_count(), 256);
    }

    #[test]
    fn test_zero_shards_fall_back() {
        let config = CacheConfig {
            shard_count: 0,
            ..Default::default()
        };
        assert_eq!(config.effective_shard_count(), DEFAULT_SHARD_COUNT);
    }

    #[test]
    fn test_zero_tick_rejected() {
        let config = CacheConfig {
            tick_duration: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTick));
    }

    #[test]
    fn test_short_horizon_rejected() {
        let config = CacheConfig {
            tick_duration: Duration::from_millis(100),
            wheel_horizon: Duration::from_millis(150),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::HorizonTooShort { .. })
        ));
    }

    #[test]
    fn test_sub_millisecond_tick_rejected() {
        let config = CacheConfig {
            tick_duration: Duration::from_micros(100),
            wheel_horizon: Duration::from_millis(10),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TickTooSmall {
                tick: Duration::from_micros(100),
                min: MIN_TICK,
            })
        );
    }

    #[test]
    fn test_slot_limit() {
        // --tick-ms 1 --horizon-secs 315360000
        let config = CacheConfig {
            tick_duration: Duration::from_millis(1),
            wheel_horizon: Duration::from_secs(315_360_000),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManySlots {
                slots: 315_360_000_000,
                max: MAX_WHEEL_SLOTS,
            })
        );

        // Huge values must not overflow while checking
        let config = CacheConfig {
            tick_duration: Duration::from_millis(1),
            wheel_horizon: Duration::MAX,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooManySlots { .. })
        ));

        assert_eq!(CacheConfig::default().wheel_slots(), Ok(36_000));
    }
}
