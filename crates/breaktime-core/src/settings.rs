//! Persisted user settings.
//!
//! Stored as JSON at `<data_dir>/settings.json`:
//!
//! ```json
//! { "breakThresholdMinutes": 30, "autoStart": true }
//! ```

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

pub const DEFAULT_THRESHOLD_MINUTES: u32 = 30;
pub const MIN_THRESHOLD_MINUTES: u32 = 15;
pub const MAX_THRESHOLD_MINUTES: u32 = 120;

/// Check a threshold against the accepted range.
///
/// # Errors
///
/// Returns `Error::InvalidConfiguration` when `minutes` is outside 15..=120
pub fn validate_threshold_minutes(minutes: u32) -> Result<u32> {
    if (MIN_THRESHOLD_MINUTES..=MAX_THRESHOLD_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(Error::InvalidConfiguration { minutes })
    }
}

/// Force a persisted threshold into the accepted range
#[must_use]
pub fn clamp_threshold_minutes(minutes: u32) -> u32 {
    minutes.clamp(MIN_THRESHOLD_MINUTES, MAX_THRESHOLD_MINUTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_threshold_minutes")]
    pub break_threshold_minutes: u32,
    /// Begin monitoring as soon as the daemon starts
    #[serde(default = "default_true")]
    pub auto_start: bool,
}

fn default_threshold_minutes() -> u32 {
    DEFAULT_THRESHOLD_MINUTES
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            break_threshold_minutes: DEFAULT_THRESHOLD_MINUTES,
            auto_start: true,
        }
    }
}

/// Persistence for the break threshold
pub trait SettingsStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `Error::PersistenceFailure` if stored settings cannot be read
    fn load_threshold_minutes(&self) -> Result<u32>;

    /// # Errors
    ///
    /// Returns `Error::PersistenceFailure` if settings cannot be written
    fn save_threshold_minutes(&self, minutes: u32) -> Result<()>;
}

/// JSON file backed settings
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Store at `<data_dir>/settings.json`
    #[must_use]
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(&data_dir.join("settings.json"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn failure(&self, reason: impl ToString) -> Error {
        Error::PersistenceFailure {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// Read the full settings file. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::PersistenceFailure` if the file exists but cannot be
    /// read or parsed
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| self.failure(e))?;
        serde_json::from_str(&raw).map_err(|e| self.failure(e))
    }

    /// Load settings, falling back to defaults on any failure
    #[must_use]
    pub fn load_or_default(&self) -> Settings {
        self.load().unwrap_or_else(|e| {
            log::warn!("{e}; using default settings");
            Settings::default()
        })
    }

    /// # Errors
    ///
    /// Returns `Error::PersistenceFailure` if the file cannot be written
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.failure(e))?;
        }
        let json = serde_json::to_string_pretty(settings).map_err(|e| self.failure(e))?;
        fs::write(&self.path, json).map_err(|e| self.failure(e))
    }
}

impl SettingsStore for FileSettingsStore {
    fn load_threshold_minutes(&self) -> Result<u32> {
        Ok(self.load()?.break_threshold_minutes)
    }

    fn save_threshold_minutes(&self, minutes: u32) -> Result<()> {
        // Keep other keys intact; a corrupt file is overwritten
        let mut settings = self.load().unwrap_or_default();
        settings.break_threshold_minutes = minutes;
        self.save(&settings)
    }
}
