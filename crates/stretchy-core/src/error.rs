//! Core error types for stretchy-core.
//!
//! Every failure the playback engine can meet ends up as one of these
//! variants. None of them escape to the rendering layer as a fault: the
//! session driver turns load failures into an `Error` snapshot.

use std::path::PathBuf;
use thiserror::Error;

use crate::repository::TrainingId;

/// Core error type for stretchy-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Repository lookups
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Activity sequence validation
    #[error("Invalid activity sequence: {0}")]
    Sequence(#[from] SequenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A session ended in its Error state or stopped before completing
    #[error("{0}")]
    Playback(String),
}

/// Errors raised while fetching a training.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Training {0} not found")]
    NotFound(TrainingId),

    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to read training plans from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse training plans: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Training {id} is not playable: {source}")]
    InvalidPlan {
        id: TrainingId,
        #[source]
        source: SequenceError,
    },
}

/// Violations of the break-pairing rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("training has no activities")]
    Empty,

    #[error("a break cannot open a training")]
    LeadingBreak,

    #[error("break at position {index} does not follow an exercise")]
    ConsecutiveBreaks { index: usize },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_error_converts_into_core_error() {
        let err: CoreError = SequenceError::LeadingBreak.into();
        assert_eq!(
            err.to_string(),
            "Invalid activity sequence: a break cannot open a training"
        );
    }

    #[test]
    fn playback_error_shows_the_snapshot_message() {
        let err = CoreError::Playback("Training 4 not found".into());
        assert_eq!(err.to_string(), "Training 4 not found");
    }

    #[test]
    fn not_found_names_the_training() {
        let err = RepositoryError::NotFound(TrainingId(42));
        assert_eq!(err.to_string(), "Training 42 not found");
    }
}
