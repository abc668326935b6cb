//! Error types for blob store operations.

use std::fmt;

/// Result type for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur during blob store operations.
///
/// Absence of a blob is not an error: backends report it as `Ok(None)`.
#[derive(Debug)]
pub enum BlobError {
    /// The blob id cannot be used as a key by this backend.
    InvalidKey { key: String, reason: String },

    /// Filesystem error in the local backend.
    Io { source: std::io::Error },

    /// Relational transaction or query failure.
    Database { source: sqlx::Error },

    /// Transport level failure talking to the object store.
    Http { source: reqwest::Error },

    /// The object store answered with a status the operation does not accept.
    UnexpectedStatus {
        method: &'static str,
        status: u16,
        body: String,
    },

    /// Backend could not be constructed from the given configuration.
    InvalidConfig { reason: String },
}

impl BlobError {
    pub fn invalid_key(key: &str, reason: &str) -> Self {
        BlobError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        BlobError::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// True when the failure was caused by the caller's input rather than the
    /// storage system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, BlobError::InvalidKey { .. })
    }

    /// HTTP status returned by the object store, if that is what failed.
    pub fn status(&self) -> Option<u16> {
        match self {
            BlobError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for BlobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobError::InvalidKey { key, reason } => {
                write!(f, "Invalid blob key '{}': {}", key, reason)
            }
            BlobError::Io { source } => write!(f, "I/O error: {}", source),
            BlobError::Database { source } => write!(f, "Database error: {}", source),
            BlobError::Http { source } => write!(f, "Network error: {}", source),
            BlobError::UnexpectedStatus {
                method,
                status,
                body,
            } => write!(f, "S3 {} failed: {} {}", method, status, body),
            BlobError::InvalidConfig { reason } => {
                write!(f, "Invalid blob storage configuration: {}", reason)
            }
        }
    }
}

impl std::error::Error for BlobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlobError::Io { source } => Some(source),
            BlobError::Database { source } => Some(source),
            BlobError::Http { source } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BlobError {
    fn from(err: std::io::Error) -> Self {
        BlobError::Io { source: err }
    }
}

impl From<sqlx::Error> for BlobError {
    fn from(err: sqlx::Error) -> Self {
        BlobError::Database { source: err }
    }
}

impl From<reqwest::Error> for BlobError {
    fn from(err: reqwest::Error) -> Self {
        BlobError::Http { source: err }
    }
}

impl From<url::ParseError> for BlobError {
    fn from(err: url::ParseError) -> Self {
        BlobError::InvalidConfig {
            reason: err.to_string(),
        }
    }
}
