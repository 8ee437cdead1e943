//! Error types for knowledge base access.

use thiserror::Error;

/// Errors raised by catalog lookups and searches.
///
/// A missing database is a configuration problem and fatal; everything else
/// degrades (FTS errors fall back to substring search, corrupt rows are
/// skipped with a debug-level log).
#[derive(Debug, Error)]
pub enum KbError {
    /// The bundled node database could not be found at the expected path.
    #[error("node database not found at {path}")]
    MissingDatabase {
        /// Path that was probed
        path: String,
    },

    /// Underlying SQLite failure that is not recoverable by fallback.
    #[error("knowledge base query failed: {message}")]
    QueryFailed {
        /// Description of the failing statement
        message: String,
    },

    /// A stored row could not be decoded into its record type.
    #[error("corrupt catalog record for {node_type}: {message}")]
    CorruptRecord {
        /// Node type of the offending row
        node_type: String,
        /// Decode failure detail
        message: String,
    },
}

impl From<rusqlite::Error> for KbError {
    fn from(err: rusqlite::Error) -> Self {
        KbError::QueryFailed {
            message: err.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KbError>;
