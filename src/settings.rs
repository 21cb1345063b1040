use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

pub const ENV_DATA_DIR: &str = "INVENTARIO_DATA_DIR";
pub const ENV_IMPORTS_PREFIX: &str = "INVENTARIO_IMPORTS_PREFIX";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// Subdirectory of `<data_dir>/imports` where uploaded files are archived.
    #[serde(default = "default_imports_prefix")]
    pub imports_prefix: String,
}

fn default_imports_prefix() -> String {
    "inventario".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            imports_prefix: default_imports_prefix(),
        }
    }
}

impl Settings {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn imports_dir(&self) -> PathBuf {
        self.data_path().join("imports").join(&self.imports_prefix)
    }

    fn apply_env(mut self) -> Self {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            if !dir.trim().is_empty() {
                self.data_dir = dir;
            }
        }
        if let Ok(prefix) = std::env::var(ENV_IMPORTS_PREFIX) {
            if !prefix.trim().is_empty() {
                self.imports_prefix = prefix;
            }
        }
        self
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("inventario")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("inventario")
}

/// Settings from the config file (defaults when missing or unreadable),
/// with environment overrides applied.
pub fn load_settings() -> Settings {
    let path = settings_path();
    let settings = if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable settings at {}: {e}", path.display());
            Settings::default()
        })
    } else {
        Settings::default()
    };
    settings.apply_env()
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| InventoryError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
