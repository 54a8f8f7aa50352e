use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for a playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Start playback as soon as the source is ready, and template embed
    /// URLs with autoplay enabled
    pub autoplay: bool,
    /// Consecutive faults tolerated before giving up
    pub max_retries: u32,
    /// Base retry delay in milliseconds, scaled linearly by attempt number
    pub retry_base_delay_ms: u64,
    /// How long buffering may last before it counts as a stall
    pub stall_timeout_ms: u64,
    /// Keyboard seek step in seconds
    pub seek_step_secs: f64,
    /// Keyboard volume step (0.0 - 1.0)
    pub volume_step: f64,
    /// Volume applied to every new session
    pub initial_volume: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            autoplay: false,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            stall_timeout_ms: 8000,
            seek_step_secs: 10.0,
            volume_step: 0.1,
            initial_volume: 1.0,
        }
    }
}

impl PlayerConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_base_delay_ms == 0 {
            return Err(ConfigError::ZeroRetryDelay);
        }
        if self.stall_timeout_ms == 0 {
            return Err(ConfigError::ZeroStallTimeout);
        }
        if !(self.seek_step_secs.is_finite() && self.seek_step_secs > 0.0) {
            return Err(ConfigError::InvalidSeekStep(self.seek_step_secs));
        }
        if !(self.volume_step > 0.0 && self.volume_step <= 1.0) {
            return Err(ConfigError::InvalidVolumeStep(self.volume_step));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(ConfigError::InvalidInitialVolume(self.initial_volume));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_base_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: PlayerConfig =
            serde_json::from_str(r#"{ "autoplay": true, "max_retries": 5 }"#).unwrap();
        assert!(config.autoplay);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_base_delay_ms, 1000);
        assert_eq!(config.seek_step_secs, 10.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = PlayerConfig {
            retry_base_delay_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroRetryDelay));

        let config = PlayerConfig {
            volume_step: 1.5,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidVolumeStep(1.5)));

        let config = PlayerConfig {
            initial_volume: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
