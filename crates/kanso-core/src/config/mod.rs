mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::KansoError;
use defaults::*;

/// Top-level Kanso configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub kanso: KansoConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KansoConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for KansoConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Storage config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Reminder config.
///
/// A task due within `due_soon_hours` of a triggering edit gets its reminder
/// sent immediately; there is no background timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_due_soon_hours")]
    pub due_soon_hours: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            due_soon_hours: default_due_soon_hours(),
        }
    }
}

/// Calendar export config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Days ahead of today included in a default export window.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, KansoError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| KansoError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| KansoError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
