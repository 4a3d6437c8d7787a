//! Error types for tidebag
//!
//! Every fallible operation in the workspace returns [`BagResult`]. We use
//! `thiserror` for the `Display` and `Error` implementations.
//!
//! End of iteration is not an error: sessions return `Ok(None)` once they are
//! exhausted. A missing entry is reported as [`BagError::NotFound`] so that
//! callers can choose between skipping and aborting.

use std::io;
use thiserror::Error;

/// Result type alias for tidebag operations
pub type BagResult<T> = std::result::Result<T, BagError>;

/// Error types for bag archives, sessions and decoding
#[derive(Debug, Error)]
pub enum BagError {
    /// Entry name absent from the archive
    #[error("Entry not found: {entryname}")]
    NotFound {
        /// The requested entry name
        entryname: String,
    },

    /// The archive carries no decodable index snapshot
    #[error("No index found in {archive}")]
    MissingIndex {
        /// Description of the archive that was scanned
        archive: String,
    },

    /// An event selection required every event but some had no match
    #[error("Could not find all requested events and all were required. Missing: {}", .events.join(", "))]
    UnmatchedEvents {
        /// Each unmatched event rendered as `topic@timestamp`
        events: Vec<String>,
    },

    /// Malformed selection, missing context fields, unsupported format, ...
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Bytes do not parse as the expected envelope or type
    #[error("Decode error ({context}): {reason}")]
    Decode {
        /// What was being decoded (entry name, type URL, ...)
        context: String,
        /// Decoder message
        reason: String,
    },

    /// Filesystem or archive-library failure
    #[error("Backend error during {operation} on {path}: {message}")]
    Backend {
        /// Operation that failed (open, read, write, list, close)
        operation: String,
        /// Archive path or entry name involved
        path: String,
        /// Backend message
        message: String,
    },

    /// Unwrapped I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration file could not be read, parsed or validated
    #[error("Config error: {0}")]
    Config(String),
}

impl BagError {
    /// Create a not-found error for `entryname`
    pub fn not_found(entryname: impl Into<String>) -> Self {
        Self::NotFound {
            entryname: entryname.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a decode error
    pub fn decode(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a backend error wrapping the offending path and backend message
    pub fn backend(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::Backend {
            operation: operation.into(),
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True if this error reports a missing archive entry
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<prost::DecodeError> for BagError {
    fn from(e: prost::DecodeError) -> Self {
        BagError::decode("protobuf", e)
    }
}
