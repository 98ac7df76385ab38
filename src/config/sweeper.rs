//! Expiration sweeper configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Expiration sweeper configuration
///
/// The sweeper is a background task that deactivates subscription records
/// past their expiration date.
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Whether the background sweep task runs at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between sweep passes
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl SweeperConfig {
    /// Get the sweep interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate sweeper configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        // Sub-minute intervals hammer the ledger for no benefit
        if self.interval_secs < 60 || self.interval_secs > 86_400 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        Ok(())
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweeper_defaults() {
        let config = SweeperConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval_secs, 3600);
        assert_eq!(config.interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_validation_interval_too_short() {
        let config = SweeperConfig {
            interval_secs: 5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_interval_too_long() {
        let config = SweeperConfig {
            interval_secs: 200_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_interval() {
        let config = SweeperConfig::default();
        assert!(config.validate().is_ok());
    }
}
