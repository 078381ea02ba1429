//! Domain-level error types for flow-logger.
//!
//! All errors are typed with `thiserror`. Callers match on the variant to
//! decide between degraded continuation and surfacing the failure.

use thiserror::Error;

use super::status::OperationalStatus;

/// Application-level errors for the logging engine and its collaborators.
#[derive(Error, Debug)]
pub enum AppError {
    /// Storage medium is not mounted.
    #[error("Storage not mounted: cannot {operation}")]
    NotMounted { operation: &'static str },

    /// Mount retries were exhausted.
    #[error("Failed to mount storage after {attempts} attempts")]
    MountFailed { attempts: usize },

    /// A read, write or append on the storage medium failed.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Round-trip self-test of the medium failed.
    #[error("Health check failed: {message}")]
    HealthCheck { message: String },

    /// Requested status change is not in the transition table.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: OperationalStatus,
        to: OperationalStatus,
    },

    /// Engine is not ready to accept or write records.
    #[error("Logger not ready")]
    NotReady,

    /// Flush requested with no current log file.
    #[error("Cannot flush: no file open")]
    NoActiveFile,

    /// Previously active log file could not be resumed.
    #[error("Cannot resume log file: {reason}")]
    ResumeRejected { reason: String },

    /// No usable recovery point was found.
    #[error("No recovery point found")]
    NoRecoveryPoint,

    /// Input rejected before any side effect.
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// JSON serialization failed.
    #[error("JSON error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// IO operation outside the storage medium failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a storage error with context.
    pub fn storage(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a storage error without an underlying IO error.
    pub fn storage_msg(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a JSON error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Whether this error came from the storage medium rather than from
    /// validation or engine state.
    #[must_use]
    pub const fn is_storage_fault(&self) -> bool {
        matches!(
            self,
            Self::NotMounted { .. }
                | Self::MountFailed { .. }
                | Self::Storage { .. }
                | Self::HealthCheck { .. }
        )
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
