//! Unified error types for faultline.

use thiserror::Error;

/// Top-level error type for configuration and snapshot handling.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file could not be resolved, read, parsed or written.
    #[error("config: {message}")]
    Config {
        /// What went wrong.
        message: String,
        /// Underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failure graph snapshot is malformed.
    #[error("snapshot: {0}")]
    Snapshot(String),
}

impl Error {
    /// Creates a configuration error without an underlying cause.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error caused by `source`.
    pub fn config_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a snapshot error.
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot(message.into())
    }
}
