// Local configuration for the editing engine.
//
// Global config: `~/.anchorage/config.toml`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anchor::{ResolverConfig, DEFAULT_MIN_CAPTURED_LEN};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Root directory for Anchorage global state: `~/.anchorage/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".anchorage"))
}

/// Path to the global config file: `~/.anchorage/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|dir| dir.join("config.toml"))
}

/// Engine configuration at `~/.anchorage/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Anchor resolver tuning.
    pub resolver: ResolverSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { resolver: ResolverSettings::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverSettings {
    /// Minimum captured-text length (UTF-16 units) for the substring
    /// fallback; shorter anchors orphan instead of matching spuriously.
    pub min_captured_len: u32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self { min_captured_len: DEFAULT_MIN_CAPTURED_LEN }
    }
}

impl EngineConfig {
    /// Load from `~/.anchorage/config.toml`. Returns defaults if the
    /// file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|path| Self::load_from(&path).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig { min_captured_len: self.resolver.min_captured_len }
    }
}
