//! Terminal configuration.
//!
//! Loaded from `~/.fabentry/config.toml`, with environment overrides for
//! the store endpoint so a kiosk image can be pointed at a database without
//! editing files:
//!
//! - `FABENTRY_STORE_URL` overrides `[store] url`
//! - `FABENTRY_STORE_TOKEN` overrides `[store] auth_token`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Door dwell time before automatic relock (milliseconds).
const DEFAULT_DWELL_MS: u64 = 3000;

/// Subscription poll cadence against the hosted store (milliseconds).
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub terminal: TerminalConfig,
}

/// Connection settings for the hosted record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database base URL (e.g. `https://fabentry.firebaseio.com`).
    #[serde(default)]
    pub url: String,
    /// Optional database secret or ID token, sent as the `auth` parameter.
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_token: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// How long the door stays logically open before the automatic relock.
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            dwell_ms: DEFAULT_DWELL_MS,
        }
    }
}

fn default_dwell_ms() -> u64 {
    DEFAULT_DWELL_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Config {
    /// Default config file location (`~/.fabentry/config.toml`).
    pub fn default_path() -> Result<PathBuf> {
        let home = directories::UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("could not determine home directory")?;
        Ok(home.join(".fabentry").join("config.toml"))
    }

    /// Load from the default path (or defaults when the file is missing),
    /// then apply environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("failed to parse config at {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_overrides(
            std::env::var("FABENTRY_STORE_URL").ok(),
            std::env::var("FABENTRY_STORE_TOKEN").ok(),
        );

        Ok(config)
    }

    /// Apply endpoint overrides; empty values are ignored.
    fn apply_overrides(&mut self, url: Option<String>, token: Option<String>) {
        if let Some(url) = url.filter(|u| !u.is_empty()) {
            self.store.url = url;
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.store.auth_token = Some(token);
        }
    }

    /// Write the config back to the given path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config at {}", path.display()))?;
        Ok(())
    }
}
