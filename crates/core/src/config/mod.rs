//! Configuration for the compatibility layer
//!
//! A single TOML file controls framework-level behavior, most importantly
//! whether compat violations are fatal (developer/strict mode) or merely
//! logged for end users. The file is created with defaults on first load
//! and can be reloaded manually.

mod loader;

use serde::{Deserialize, Serialize};

use crate::violations::Violations;

pub use loader::{config_path, configs_dir, shim_base_dir};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Could not determine config directory from the shim location
    #[error("Config directory not available - could not resolve shim base path")]
    NoConfigDirectory,
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Core framework configuration.
///
/// Loaded from `configs/hookshim.toml` under the shim base directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    /// Developer/strict mode: compat violations crash instead of logging
    pub strict: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            strict: false,
        }
    }
}

impl CoreConfig {
    /// Load config from file, creating default if missing.
    pub fn load() -> ConfigResult<Self> {
        let path = config_path()?;

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("Loaded config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save()?;
            tracing::info!("Created default config at {:?}", path);
            Ok(default)
        }
    }

    /// Save config to file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let path = config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reload config from file.
    pub fn reload(&mut self) -> ConfigResult<()> {
        let path = config_path()?;
        let content = std::fs::read_to_string(&path)?;
        *self = toml::from_str(&content)?;
        tracing::debug!("Reloaded config from {:?}", path);
        Ok(())
    }

    /// Violation classes that should panic under this config.
    pub fn fatal_violations(&self) -> Violations {
        if self.strict {
            Violations::all()
        } else {
            Violations::empty()
        }
    }
}
