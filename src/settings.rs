//! Runtime settings
//!
//! Host-side knobs loaded from a YAML file: device identity, where the
//! configuration image lives, the protocol listen address, and the
//! button timing constants. Everything has a sensible default so the
//! binary runs without any file present.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root settings structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Identity announced in the `READY:` handshake.
    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// Where the configuration image is persisted. Defaults to the
    /// platform data directory when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,

    /// TCP address the remote protocol listens on.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Debounce window for every physical button.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Hold time that turns a press into a long press.
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
}

impl Settings {
    /// Load settings from a YAML file with validation.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file: {}", path.display()))?;

        let settings: Settings = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML settings: {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.device_id.is_empty() {
            anyhow::bail!("device_id cannot be empty");
        }
        if self.device_id.contains(':') || self.device_id.contains(char::is_whitespace) {
            anyhow::bail!("device_id must not contain ':' or whitespace");
        }
        if self.debounce_ms == 0 {
            anyhow::bail!("debounce_ms must be positive");
        }
        if self.long_press_ms <= self.debounce_ms {
            anyhow::bail!(
                "long_press_ms ({}) must exceed debounce_ms ({})",
                self.long_press_ms,
                self.debounce_ms
            );
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    /// Resolve the storage path: explicit setting first, then the
    /// platform data directory, then the working directory.
    pub fn resolve_storage_path(&self) -> PathBuf {
        if let Some(path) = &self.storage_path {
            return path.clone();
        }
        dirs::data_dir()
            .map(|dir| dir.join("footctl").join("config.bin"))
            .unwrap_or_else(|| PathBuf::from("footctl-config.bin"))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            storage_path: None,
            listen: default_listen(),
            debounce_ms: default_debounce_ms(),
            long_press_ms: default_long_press_ms(),
        }
    }
}

// Default value functions
fn default_device_id() -> String {
    "FOOTCTL_V3".to_string()
}
fn default_listen() -> String {
    "127.0.0.1:7430".to_string()
}
fn default_debounce_ms() -> u64 {
    50
}
fn default_long_press_ms() -> u64 {
    1000
}
