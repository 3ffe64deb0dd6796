//! Error types for the LDIF to CSV conversion.
//!
//! - [`ParseError`] - DN header errors raised by the decomposer
//! - [`ConvertError`] - Top-level conversion errors (read, parse, write)
//! - [`ServerError`] - HTTP layer errors
//!
//! Malformed attribute lines and DN parts without `=` are not errors:
//! the parser skips them.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors raised while decomposing a DN header line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line does not start with the `dn: ` marker.
    #[error("Missing 'dn: ' marker in line: {line}")]
    MissingDnMarker { line: String },
}

// =============================================================================
// Conversion Errors (top-level)
// =============================================================================

/// Errors returned by [`crate::transform::pipeline::convert`].
///
/// A conversion either completes with a full output file or fails with one
/// of these; there is no partial result.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Input could not be read or output could not be written.
    #[error("IO error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV writer failure.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// DN header could not be decomposed.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl ConvertError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Conversion failed.
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// Invalid request.
    #[error("{0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
