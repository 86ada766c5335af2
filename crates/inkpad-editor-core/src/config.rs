//! Editor configuration, loaded from a `.toml` or `.json` file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::extensions::BUILTIN_NAMES;
use crate::keymap::Platform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Enabled extensions, in registration order.
    pub extensions: Vec<SmolStr>,
    /// Maximum number of undo steps kept.
    pub history_depth: usize,
    /// Idle window before a change is auto-saved.
    pub autosave_delay_ms: u64,
    /// Decides what `Mod` means in shortcuts.
    pub platform: Platform,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            extensions: BUILTIN_NAMES.iter().copied().map(SmolStr::new_static).collect(),
            history_depth: 100,
            autosave_delay_ms: 3000,
            platform: Platform::current(),
        }
    }
}

#[derive(Debug, thiserror::Error, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    #[diagnostic(code(inkpad::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML config")]
    #[diagnostic(code(inkpad::config::toml))]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON config")]
    #[diagnostic(code(inkpad::config::json))]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format for {}", path.display())]
    #[diagnostic(code(inkpad::config::format), help("use a .toml or .json file"))]
    UnsupportedFormat { path: PathBuf },
}

impl EditorConfig {
    /// Load from `path`, picking the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let read = || {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        };
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&read()?)?,
            Some("json") => Self::from_json(&read()?)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };
        tracing::debug!(path = %path.display(), extensions = config.extensions.len(), "loaded editor config");
        Ok(config)
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}
