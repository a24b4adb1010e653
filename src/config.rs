//! Configuration Management
//!
//! Handles persistent configuration storage for gdiscovery.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted for an API key when none is configured
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Validate arguments against the discovery document by default
    #[serde(default)]
    pub validate: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Discovery Service root, e.g. `https://www.googleapis.com/`
    #[serde(default)]
    pub discovery_root_url: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Last discovered API, as `name:version`
    #[serde(default)]
    pub last_api: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gdiscovery").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    /// Get effective API key (CLI > config > environment)
    pub fn effective_api_key(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.api_key.clone())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
    }

    pub fn effective_discovery_root_url(&self) -> String {
        self.discovery_root_url
            .clone()
            .unwrap_or_else(|| crate::gcp::client::DEFAULT_DISCOVERY_ROOT_URL.to_string())
    }

    /// Remember the last discovered API and save
    pub fn set_last_api(&mut self, name: &str, version: &str) -> Result<()> {
        self.last_api = Some(format!("{name}:{version}"));
        self.save()
    }
}
