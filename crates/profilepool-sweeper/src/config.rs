//! Configuration for the unlock sweeper
//!
//! Defines the lock staleness threshold and the sweep interval.

use crate::SweeperError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default lock staleness threshold: 10 minutes
pub const DEFAULT_UNLOCK_TIMEOUT_MS: u64 = 600_000;

/// Default time between sweeps: 1 minute
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Configuration for the unlock sweeper
///
/// # Examples
///
/// ```
/// use profilepool_sweeper::SweeperConfig;
///
/// let config = SweeperConfig::default();
/// assert_eq!(config.unlock_timeout_ms, 600_000);
/// assert_eq!(config.sweep_interval_ms, 60_000);
///
/// let config = SweeperConfig::with_unlock_timeout_ms(30_000);
/// assert_eq!(config.unlock_timeout().as_secs(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Locks older than this are force-released (in milliseconds)
    /// Default: 600000 (10 minutes)
    #[serde(default = "default_unlock_timeout_ms")]
    pub unlock_timeout_ms: u64,

    /// How often to sweep (in milliseconds)
    /// Default: 60000 (1 minute)
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

fn default_unlock_timeout_ms() -> u64 {
    DEFAULT_UNLOCK_TIMEOUT_MS
}

fn default_sweep_interval_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            unlock_timeout_ms: DEFAULT_UNLOCK_TIMEOUT_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl SweeperConfig {
    /// Default configuration with a custom staleness threshold
    pub fn with_unlock_timeout_ms(unlock_timeout_ms: u64) -> Self {
        Self {
            unlock_timeout_ms,
            ..Default::default()
        }
    }

    /// Get the staleness threshold as Duration
    pub fn unlock_timeout(&self) -> Duration {
        Duration::from_millis(self.unlock_timeout_ms)
    }

    /// Get the sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Check the configuration can drive a worker
    pub fn validate(&self) -> Result<(), SweeperError> {
        if self.sweep_interval_ms == 0 {
            return Err(SweeperError::Config(
                "sweep_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
