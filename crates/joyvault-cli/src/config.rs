//! Configuration file support for the joyvault CLI.
//!
//! Configuration is stored at `~/.config/joyvault/config.toml` (XDG standard)
//! or `~/Library/Application Support/com.joyvault.joyvault/config.toml` on macOS.
//! Set `JOYVAULT_CONFIG_DIR` to use another directory.
//!
//! # Example configuration
//!
//! ```toml
//! [defaults]
//! verbosity = 1
//! secrets = 5
//!
//! [client]
//! program-id = "8bqnKmrsbNdZHP8p9sCV1oeeRkzkpQbYvxBeFZ2DiXSB"
//! payment-mint = "Gh9ZwEmdLJ8DscKNTkTqPbNwLNNBjuSzaG9Vp2KGtKJr"
//! max-attempts = 3
//! secret-lifecycle = "append-only"
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use joyvault_core::ClientConfig;

/// Overrides the configuration directory, mainly for tests.
pub const CONFIG_DIR_ENV: &str = "JOYVAULT_CONFIG_DIR";

/// Main configuration structure
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Default settings applied to all commands
    #[serde(default)]
    pub defaults: Defaults,

    /// Protocol client settings (program id, payment mint, retry budget)
    #[serde(default)]
    pub client: ClientConfig,
}

/// Default settings
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Defaults {
    /// Default verbosity level (0-3), used when no `-v` is given
    pub verbosity: Option<u8>,

    /// Number of secret addresses `derive` lists when `--secrets` is absent
    pub secrets: Option<u32>,
}

impl Config {
    /// Load configuration from the default path, or return defaults if not found.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}

/// Get the path to the configuration file.
///
/// Uses XDG config directory on Linux, Application Support on macOS.
pub fn config_path() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir).join("config.toml"));
    }

    let base_dirs = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

    #[cfg(target_os = "macos")]
    {
        let config_dir = base_dirs
            .home_dir()
            .join("Library/Application Support/com.joyvault.joyvault");
        Ok(config_dir.join("config.toml"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        let config_dir = base_dirs.config_dir().join("joyvault");
        Ok(config_dir.join("config.toml"))
    }
}
