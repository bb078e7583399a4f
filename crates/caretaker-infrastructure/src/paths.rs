//! Path resolution for caretaker configuration files.
//!
//! ```text
//! ~/.config/caretaker/         # Config directory (platform default)
//! └── config.toml              # Application configuration
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "caretaker";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for caretaker_core::CaretakerError {
    fn from(err: PathError) -> Self {
        caretaker_core::CaretakerError::config(err.to_string())
    }
}

pub struct CaretakerPaths;

impl CaretakerPaths {
    /// Returns the caretaker configuration directory
    /// (e.g. `~/.config/caretaker/` on Linux).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
