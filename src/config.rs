//! Configuration management for the input frontend
//!
//! Handles loading and validation of the YAML configuration file. Every
//! field has a default, so an empty file (or no file at all) is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::input::InputSettings;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Input core configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InputConfig {
    /// Number of player slots
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    /// Attach the system keyboard as an input device
    #[serde(default = "default_true")]
    pub keyboard: bool,
    /// Attach the system mouse as an input device
    #[serde(default)]
    pub mouse: bool,
    /// Directory of per-device mapping documents (default: state dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_dir: Option<PathBuf>,
    /// Directory watched for device hot-plug
    #[serde(default = "default_device_dir")]
    pub device_dir: PathBuf,
    /// SDL controller database (`gamecontrollerdb.txt`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_db: Option<PathBuf>,
    /// Input pump tick interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_players: default_max_players(),
            keyboard: true,
            mouse: false,
            mapping_dir: None,
            device_dir: default_device_dir(),
            controller_db: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Settings database configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// sled database directory (default: state dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_max_players() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_device_dir() -> PathBuf {
    PathBuf::from("/dev/input")
}

fn default_poll_interval_ms() -> u64 {
    10
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    /// Parse and validate YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.input.max_players == 0 {
            anyhow::bail!("input.max_players must be at least 1");
        }
        if self.input.poll_interval_ms == 0 {
            anyhow::bail!("input.poll_interval_ms must be at least 1");
        }
        Ok(())
    }

    /// Runtime settings for the input manager
    pub fn input_settings(&self) -> InputSettings {
        InputSettings {
            max_players: self.input.max_players,
            keyboard: self.input.keyboard,
            mouse: self.input.mouse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.input.max_players, 4);
        assert!(config.input.keyboard);
        assert_eq!(config.input.device_dir, PathBuf::from("/dev/input"));
        assert_eq!(config.input_settings(), InputSettings::default());
    }

    #[test]
    fn test_partial_config() {
        let yaml = r#"
input:
  max_players: 2
  mouse: true
  controller_db: "/usr/share/gamecontrollerdb.txt"
storage:
  path: "/var/lib/frontend/settings"
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.input.max_players, 2);
        assert!(config.input.mouse);
        assert!(config.input.keyboard);
        assert_eq!(config.input.poll_interval_ms, 10);
        assert_eq!(
            config.input.controller_db,
            Some(PathBuf::from("/usr/share/gamecontrollerdb.txt"))
        );
        assert_eq!(config.storage.path, Some(PathBuf::from("/var/lib/frontend/settings")));
    }

    #[test]
    fn test_validation_rejects_zero_slots() {
        assert!(AppConfig::from_yaml("input:\n  max_players: 0\n").is_err());
        assert!(AppConfig::from_yaml("input:\n  poll_interval_ms: 0\n").is_err());
        assert!(AppConfig::from_yaml("input: [1, 2]").is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.yaml");

        let mut config = AppConfig::default();
        config.input.max_players = 8;
        config.input.mapping_dir = Some(PathBuf::from("mappings"));
        std::fs::write(&path, serde_yaml::to_string(&config)?)?;

        let loaded = AppConfig::load(&path).await?;
        assert_eq!(loaded, config);
        assert!(AppConfig::load(&temp_dir.path().join("missing.yaml")).await.is_err());
        Ok(())
    }
}
