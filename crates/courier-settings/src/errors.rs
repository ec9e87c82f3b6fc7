//! Failures while reading `settings.json`.

use std::path::PathBuf;

use thiserror::Error;

/// Why the settings file could not be used.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read courier settings at {}: {source}", path.display())]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The file is not valid JSON or does not fit the settings schema.
    #[error("malformed courier settings at {}: {source}", path.display())]
    Json {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying parse failure.
        source: serde_json::Error,
    },
}

/// Result of loading settings.
pub type Result<T> = std::result::Result<T, SettingsError>;
