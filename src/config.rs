//! Runtime configuration.
//!
//! Settings are read from `<config_dir>/tabata/config.json` if that file
//! exists; every field is optional. `TABATA_SOCKET` and `TABATA_VOICE_DIR`
//! override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::daemon::announcer::DEFAULT_AMBIENT_ONE_IN;
use crate::daemon::ipc::DEFAULT_SOCKET_PATH;

/// Environment variable overriding the socket path.
pub const SOCKET_ENV: &str = "TABATA_SOCKET";

/// Environment variable overriding the voice clip directory.
pub const VOICE_DIR_ENV: &str = "TABATA_VOICE_DIR";

const APP_DIR: &str = "tabata";
const CONFIG_FILE: &str = "config.json";
const LOG_FILE: &str = "tabata_timer.log";

// ============================================================================
// TabataConfig
// ============================================================================

/// Configuration shared by the client and the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabataConfig {
    /// Unix socket the daemon listens on
    pub socket_path: PathBuf,
    /// Directory holding `<clip>.wav` voice files
    pub voice_dir: PathBuf,
    /// File the spawned daemon's stderr is appended to
    pub log_file: PathBuf,
    /// Odds of an ambient clip per announcement (one in N, 0 = never)
    pub ambient_one_in: u32,
    /// Bound on each output device readiness wait
    pub device_timeout_ms: u64,
    /// Run the daemon without an output device
    pub mute: bool,
}

impl Default for TabataConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            voice_dir: data_dir.join(APP_DIR).join("voice"),
            log_file: std::env::temp_dir().join(LOG_FILE),
            ambient_one_in: DEFAULT_AMBIENT_ONE_IN,
            device_timeout_ms: 1000,
            mute: false,
        }
    }
}

impl TabataConfig {
    /// Default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Loads the configuration from the default location and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(socket) = lookup(SOCKET_ENV).filter(|v| !v.is_empty()) {
            self.socket_path = PathBuf::from(socket);
        }
        if let Some(voice_dir) = lookup(VOICE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.voice_dir = PathBuf::from(voice_dir);
        }
    }

    /// Sets the socket path.
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }

    /// Device readiness timeout as a `Duration`.
    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }
}
