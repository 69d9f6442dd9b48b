//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading the user / project configuration documents.
///
/// A missing file is never an error; everything here means a file exists
/// but cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read an existing config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid YAML syntax.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The document parsed, but its top level is not a key/value mapping.
    #[error("config file '{path}' must contain a mapping at the top level")]
    NotAMapping { path: PathBuf },

    /// A top-level key is not a string (e.g. `1: foo`).
    #[error("config file '{path}' has a non-string key: {key}")]
    NonStringKey { path: PathBuf, key: String },

    /// The working directory could not be determined.
    #[error("failed to determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
