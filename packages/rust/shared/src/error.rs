//! Error types for ReportSmith.
//!
//! Library crates use [`ReportError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Failures scoped to one unit of work (one uploaded file, one generated
//! section, one refinement attempt) are recorded inline by the pipeline and
//! never surface as a `ReportError`. The variants below either abort a whole
//! operation or are used internally before being annotated in place.

use std::path::PathBuf;

/// Top-level error type for all ReportSmith operations.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Template shape is invalid. Never partially applied.
    #[error("template error: {message}")]
    Structural { message: String },

    /// A single file could not be extracted.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// The AI capability failed to produce usable output.
    #[error("generation error: {0}")]
    Generation(String),

    /// No session exists for the given identifier.
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// The session has no generated content yet.
    #[error("no content to export for session {session_id}")]
    NoContent { session_id: String },

    /// The requested output format is not supported.
    #[error("unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Document rendering failed.
    #[error("render error: {0}")]
    Render(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// JSON (de)serialization error outside template validation.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReportError>;

impl ReportError {
    /// Create a structural (template) error from any displayable message.
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a session-not-found error.
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Create a no-content error.
    pub fn no_content(session_id: impl Into<String>) -> Self {
        Self::NoContent {
            session_id: session_id.into(),
        }
    }

    /// Create an unsupported-format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
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
