//! Persisted equalizer settings.
//!
//! Saves and restores band gains, the last selected output device, and the
//! per-application session state. Loading is lenient: a missing or corrupt
//! file yields defaults, and out-of-range values are clamped so a
//! hand-edited file can never push an invalid gain into the live unit.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::eq::{BAND_COUNT, GAIN_MAX_DB, GAIN_MIN_DB};

/// Config version (for future migrations)
const CONFIG_VERSION: u32 = 1;

/// Get config directory path
fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("contour"))
}

/// Get config file path
fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.json"))
}

/// Persisted per-application session state.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppSessionConfig {
    pub volume: f32,
    pub eq_enabled: bool,
}

/// Complete persisted configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EqConfig {
    /// Config version (for future migrations)
    pub version: u32,
    /// Gain per band in dB, band 0 through 9
    pub band_gains: [f32; BAND_COUNT],
    /// Display name of the last selected output device (for matching on restart)
    pub output_device_name: Option<String>,
    /// Session state by bundle id
    pub app_sessions: HashMap<String, AppSessionConfig>,
}

impl Default for EqConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            band_gains: [0.0; BAND_COUNT],
            output_device_name: None,
            app_sessions: HashMap::new(),
        }
    }
}

impl EqConfig {
    /// Load configuration from the default location.
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("could not determine config path, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit path, falling back to defaults
    /// on a missing or unparsable file.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!(?path, "no config file, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<EqConfig>(&content) {
                Ok(config) => {
                    debug!(?path, "configuration loaded");
                    config.sanitized()
                }
                Err(e) => {
                    warn!(?path, error = %e, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(?path, error = %e, "failed to read config, using defaults");
                Self::default()
            }
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), String> {
        let dir = config_dir().ok_or_else(|| "could not determine config directory".to_string())?;
        let path = config_path().ok_or_else(|| "could not determine config path".to_string())?;

        if !dir.exists() {
            fs::create_dir_all(&dir)
                .map_err(|e| format!("failed to create config directory: {e}"))?;
        }
        self.save_to(&path)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("failed to serialize config: {e}"))?;
        fs::write(path, content).map_err(|e| format!("failed to write config: {e}"))?;
        debug!(?path, "configuration saved");
        Ok(())
    }

    /// Clamp all loaded values into their valid ranges.
    fn sanitized(mut self) -> Self {
        for gain in &mut self.band_gains {
            *gain = gain.clamp(GAIN_MIN_DB, GAIN_MAX_DB);
        }
        for session in self.app_sessions.values_mut() {
            session.volume = session.volume.clamp(0.0, 1.0);
        }
        self
    }
}
