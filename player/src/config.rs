//! Configuration loading for the player.
//!
//! Values are layered: built-in defaults, then the JSON config file, then
//! command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::{debug, info};
use marquee_core::PlayerConfig;

/// Command-line values that win over the config file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub autoplay: bool,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub stall_timeout_ms: Option<u64>,
}

impl Overrides {
    fn apply(&self, config: &mut PlayerConfig) {
        if self.autoplay {
            config.autoplay = true;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(delay) = self.retry_base_delay_ms {
            config.retry_base_delay_ms = delay;
        }
        if let Some(timeout) = self.stall_timeout_ms {
            config.stall_timeout_ms = timeout;
        }
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "marquee")
}

/// Default location of the config file
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
}

/// Resolve the effective configuration
///
/// An explicitly given path must exist; the default path is optional.
pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> Result<PlayerConfig> {
    let mut config = match explicit {
        Some(path) => read_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_file(&path)?,
            _ => {
                debug!("No config file, using defaults");
                PlayerConfig::default()
            }
        },
    };

    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<PlayerConfig> {
    info!("Loading config from {}", path.display());
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_values_are_overridden_by_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "max_retries": 5, "stall_timeout_ms": 4000 }"#).unwrap();

        let overrides = Overrides {
            autoplay: true,
            max_retries: Some(2),
            ..Default::default()
        };
        let config = load(Some(&path), &overrides).unwrap();
        assert!(config.autoplay);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.stall_timeout_ms, 4000);
        assert_eq!(config.retry_base_delay_ms, 1000);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(load(Some(&path), &Overrides::default()).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "volume_step": 0 }"#).unwrap();
        assert!(load(Some(&path), &Overrides::default()).is_err());

        let overrides = Overrides {
            retry_base_delay_ms: Some(0),
            ..Default::default()
        };
        fs::write(&path, "{}").unwrap();
        assert!(load(Some(&path), &overrides).is_err());
    }
}
