//! Error types for herbgraph.
//!
//! Library crates use [`HerbGraphError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all herbgraph operations.
#[derive(Debug, thiserror::Error)]
pub enum HerbGraphError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a source document.
    #[error("network error: {0}")]
    Network(String),

    /// HTML parsing or content extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A table row that does not decode into the expected named fields.
    #[error("malformed row: column {column}: {reason}")]
    MalformedRow { column: usize, reason: String },

    /// A single graph statement failed. Recoverable: the caller logs and moves on.
    #[error("graph error: {0}")]
    Graph(String),

    /// The graph store could not be reached. Fatal for the run.
    #[error("graph connection error: {0}")]
    Connection(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unknown label, bad URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HerbGraphError>;

impl HerbGraphError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// Create a malformed-row error for the given column.
    pub fn malformed_row(column: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            column,
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the run instead of being logged and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Config { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = HerbGraphError::config("missing password");
        assert_eq!(err.to_string(), "config error: missing password");

        let err = HerbGraphError::malformed_row(0, "no hyperlink text");
        assert_eq!(err.to_string(), "malformed row: column 0: no hyperlink text");
    }

    #[test]
    fn only_connection_and_config_errors_are_fatal() {
        assert!(HerbGraphError::Connection("refused".into()).is_fatal());
        assert!(HerbGraphError::config("bad").is_fatal());
        assert!(!HerbGraphError::Graph("constraint".into()).is_fatal());
        assert!(!HerbGraphError::Network("timeout".into()).is_fatal());
        assert!(!HerbGraphError::parse("no infobox").is_fatal());
    }
}
