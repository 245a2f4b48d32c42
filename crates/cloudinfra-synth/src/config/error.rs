//! Configuration resolution errors
//!
//! Every variant is fatal: resolution happens before any resource is
//! composed, so a failure here means nothing is emitted.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration resolution errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No region profiles were configured
    #[error("no region profiles configured")]
    NoRegions,

    /// The region profile has no section for the requested branch
    #[error("branch '{branch}' not found in profile '{}'", path.display())]
    ConfigNotFound { branch: String, path: PathBuf },

    /// A profile or application file could not be read
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A profile file is not valid INI
    #[error("failed to parse profile '{}': {message}", path.display())]
    ProfileSyntax { path: PathBuf, message: String },

    /// A key required by a composer is absent
    #[error("missing required key '{key}' for region {region}")]
    MissingKey { key: String, region: String },

    /// A key has a value that cannot be used
    #[error("invalid value for '{key}' in region {region}: {reason}")]
    InvalidValue {
        key: String,
        region: String,
        reason: String,
    },

    /// A list-valued key repeats an item (after normalization)
    #[error("duplicate value '{value}' in '{key}'")]
    DuplicateParameter { key: String, value: String },

    /// The application list is not a list of valid descriptors
    #[error("invalid application list '{}': {reason}", path.display())]
    ApplicationConfigInvalid { path: PathBuf, reason: String },
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid value error
    pub fn invalid(key: &str, region: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            region: region.to_string(),
            reason: reason.into(),
        }
    }
}
