//! Unified error type for streamline.
//!
//! Errors raised before a response is committed become status codes via
//! [`Error::http_status`]. Errors raised while a body is streaming terminate
//! that one connection.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Every failure mode a request or the startup path can hit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested file could not be opened.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "media file").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The writer kept its marker but produced no bytes for too long.
    #[error("No new data in {} for {idle:?}", .path.display())]
    IdleTimeout {
        /// File being tailed.
        path: PathBuf,
        /// How long the tail went without progress.
        idle: Duration,
    },

    /// The server is shutting down.
    #[error("Stream cancelled")]
    Cancelled,

    /// Configuration could not be parsed or is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::Io { .. } => 500,
            Error::IdleTimeout { .. } => 504,
            Error::Cancelled => 503,
            Error::Config(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
