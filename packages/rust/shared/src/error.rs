//! Error types for LeadScout.
//!
//! Library crates use [`LeadScoutError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.
//!
//! Fetch failures are split into [`Blocked`](LeadScoutError::Blocked),
//! [`Timeout`](LeadScoutError::Timeout), and [`Network`](LeadScoutError::Network)
//! so the interactive single-source path can tell a caller *why* an origin could
//! not be read, while the unattended sweep treats all three as "skip this origin".

use std::path::PathBuf;

/// Top-level error type for all LeadScout operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Invocation-boundary credential failure (sweep shared secret).
    #[error("auth error: {message}")]
    Auth { message: String },

    /// Search index query error.
    #[error("search error: {0}")]
    Search(String),

    /// The target origin actively refused access (HTTP 403).
    #[error("origin blocked access: {0}")]
    Blocked(String),

    /// An outbound request exceeded its deadline.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Generic network/HTTP error during probe or fetch.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Completion service transport error. Only the call itself failing lands
    /// here; malformed completion *output* degrades to zero items instead.
    #[error("completion error: {0}")]
    Completion(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Data validation error (missing identity field, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadScoutError>;

impl LeadScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an auth error from any displayable message.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
