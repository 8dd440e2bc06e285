//! Error types for interaction-tracker

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Main error type for tracker operations
///
/// Storage and network failures inside `log_event` and `flush` are logged and
/// absorbed; they only surface here from explicit calls such as
/// [`crate::storage::KeyValueStore`] operations or configuration loading.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The tracker was requested outside an installed scope
    #[error("interaction tracker requested outside of an installed TrackerScope")]
    OutsideScope,

    /// Export format is not `json` or `csv`
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// JSON encoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writer failure
    #[error("CSV error: {0}")]
    Csv(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Key-value store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The remote collector could not be set up
    #[error("Collector error: {0}")]
    Collector(#[from] CollectorError),

    /// No Tokio runtime available, or the runtime refused work
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Errors from a key-value store backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Snapshot serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Errors from delivering a batch to the remote collector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectorError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_io_display_names_operation_and_path() {
        let err = StorageError::io(
            "writing snapshot",
            "/tmp/events",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("writing snapshot"));
        assert!(message.contains("/tmp/events"));
    }

    #[test]
    fn test_tracker_error_wraps_storage() {
        let err: TrackerError = StorageError::Backend("disk full".into()).into();
        assert!(matches!(err, TrackerError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
