//! Persisted user preferences.
//!
//! Only the colour theme is stored, as JSON at
//! `<config_dir>/convertkit/preferences.json`. A missing or unreadable file
//! falls back to the defaults; `CONVERTKIT_THEME` picks the default theme.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable consulted when no preference file exists.
pub const THEME_ENV: &str = "CONVERTKIT_THEME";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Parse `light` / `dark`, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    fn from_env() -> Self {
        std::env::var(THEME_ENV)
            .ok()
            .and_then(|v| Theme::from_name(&v))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
}

impl Preferences {
    /// `<config_dir>/convertkit/preferences.json`, when the platform has a
    /// config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("convertkit").join("preferences.json"))
    }

    /// Read preferences from `path`.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not read preferences '{}': {}", path.display(), e);
                }
                return Self {
                    theme: Theme::from_env(),
                };
            }
        };
        match serde_json::from_str(&raw) {
            Ok(prefs) => {
                debug!("Loaded preferences from '{}'", path.display());
                prefs
            }
            Err(e) => {
                warn!("Ignoring malformed preferences '{}': {}", path.display(), e);
                Self {
                    theme: Theme::from_env(),
                }
            }
        }
    }

    /// Write preferences to `path`, creating its directory.
    pub fn save(&self, path: &Path) -> Result<(), ConvertError> {
        let write_err = |source| ConvertError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConvertError::Internal(e.to_string()))?;
        std::fs::write(path, json).map_err(write_err)?;
        debug!("Saved preferences to '{}'", path.display());
        Ok(())
    }

    /// Flip the theme and return the new value.
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }
}
