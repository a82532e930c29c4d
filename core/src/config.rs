//! Persisted connection settings and UI preferences.
//!
//! Everything lives under the Quill home directory (`~/.quill`, overridable
//! via `QUILL_HOME`): `settings.json` for the endpoint configuration and
//! `theme.json` for the dark-mode flag. Both are loaded once at startup with
//! built-in defaults as fallback, mutated wholesale on explicit save, and
//! rewritten through a temp-file + rename so a crash can never leave a
//! half-written file behind.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::error::QuillErr;
use crate::error::Result;
use crate::flags::QUILL_DEFAULT_BASE_URL;
use crate::flags::QUILL_DEFAULT_MODEL;

const SETTINGS_FILENAME: &str = "settings.json";
const THEME_FILENAME: &str = "theme.json";

/// Connection settings for the completion endpoint. One process-wide
/// instance, shared by value with the [`crate::ModelClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: QUILL_DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: QUILL_DEFAULT_MODEL.to_string(),
        }
    }
}

impl Settings {
    /// Load from `settings.json`, falling back to the defaults when the file
    /// is missing or unreadable.
    pub fn load(home: &Path) -> Self {
        load_json(&home.join(SETTINGS_FILENAME)).unwrap_or_default()
    }

    /// Persist the full settings value. Partial-field persistence is not
    /// possible by construction.
    pub fn save(&self, home: &Path) -> Result<()> {
        write_json_atomically(&home.join(SETTINGS_FILENAME), self)
    }

    /// All three fields must be non-empty before a request may be issued.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(QuillErr::MissingConfiguration("base URL"));
        }
        if self.api_key.trim().is_empty() {
            return Err(QuillErr::MissingConfiguration("API key"));
        }
        if self.model.trim().is_empty() {
            return Err(QuillErr::MissingConfiguration("model"));
        }
        Ok(())
    }
}

/// Presentation preferences, persisted separately from [`Settings`] so that
/// toggling the theme never rewrites the connection settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePrefs {
    pub dark_mode: bool,
}

impl ThemePrefs {
    pub fn load(home: &Path) -> Self {
        load_json(&home.join(THEME_FILENAME)).unwrap_or_default()
    }

    pub fn save(self, home: &Path) -> Result<()> {
        write_json_atomically(&home.join(THEME_FILENAME), &self)
    }

    pub fn toggled(self) -> Self {
        Self {
            dark_mode: !self.dark_mode,
        }
    }
}

/// Returns the Quill home directory, `$QUILL_HOME` or `~/.quill`. Does not
/// verify that the directory exists.
pub fn quill_home() -> std::io::Result<PathBuf> {
    if let Ok(home) = std::env::var("QUILL_HOME")
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }
    let mut p = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "could not find home directory")
    })?;
    p.push(".quill");
    Ok(p)
}

/// Path to the folder where Quill log files are written.
pub fn log_dir(home: &Path) -> PathBuf {
    home.join("log")
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("ignoring corrupt {}: {e}", path.display());
            None
        }
    }
}

fn write_json_atomically<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn settings_round_trip_survives_a_restart() {
        let home = TempDir::new().unwrap();
        let settings = Settings {
            base_url: "http://localhost:1234/v1/chat/completions".to_string(),
            api_key: "sk-test".to_string(),
            model: "local-model".to_string(),
        };
        settings.save(home.path()).unwrap();

        // A fresh load simulates a process restart.
        let reloaded = Settings::load(home.path());
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn missing_settings_file_falls_back_to_defaults() {
        let home = TempDir::new().unwrap();
        let settings = Settings::load(home.path());
        assert_eq!(settings, Settings::default());
        assert!(settings.api_key.is_empty());
    }

    #[test]
    fn corrupt_settings_file_falls_back_to_defaults() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join(SETTINGS_FILENAME), "{not json").unwrap();
        assert_eq!(Settings::load(home.path()), Settings::default());
    }

    #[test]
    fn validate_names_the_first_empty_field() {
        let settings = Settings {
            api_key: String::new(),
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, QuillErr::MissingConfiguration("API key")));

        assert!(Settings::default().validate().is_err());
        let complete = Settings {
            api_key: "sk-test".to_string(),
            ..Settings::default()
        };
        assert!(complete.validate().is_ok());
    }

    #[test]
    fn theme_toggle_round_trips_without_touching_settings() {
        let home = TempDir::new().unwrap();
        let settings = Settings {
            api_key: "sk-test".to_string(),
            ..Settings::default()
        };
        settings.save(home.path()).unwrap();

        let prefs = ThemePrefs::load(home.path()).toggled();
        assert!(prefs.dark_mode);
        prefs.save(home.path()).unwrap();

        assert_eq!(ThemePrefs::load(home.path()), prefs);
        assert_eq!(Settings::load(home.path()), settings);
    }
}
