//! Error types for the SoundVault library.
//!
//! One enum covers every failure surface the library exposes. Orchestration
//! layers (scanner, enricher) convert per-file failures into counters; only
//! setup failures propagate to the caller as values of this type.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for library operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    // Record lookup errors
    #[error("File record not found: {id}")]
    FileNotFound { id: i64 },

    #[error("Collection not found: {id}")]
    CollectionNotFound { id: i64 },

    // Integrity errors
    #[error("A file record already exists for path: {path}")]
    DuplicatePath { path: String },

    #[error("A tag named '{name}' already exists")]
    DuplicateTag { name: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, LibraryError>;

// Conversion implementations for common error types

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for LibraryError {
    fn from(err: rusqlite::Error) -> Self {
        LibraryError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl LibraryError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        LibraryError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        LibraryError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
