//! Error types for foot scan processing.
//!
//! Sparse or degenerate input is not an error: stages return empty results or
//! `None` instead. Errors are reserved for caller protocol mistakes and bad
//! configuration.

use thiserror::Error;

/// Result type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur during scan processing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScanError {
    /// A configuration value is out of range.
    #[error("invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of the invalid parameter.
        reason: String,
    },

    /// Points were ingested after reconstruction started.
    #[error("ingestion is closed; call resume_accumulating() first")]
    IngestClosed,

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,
}

impl ScanError {
    /// Shorthand for [`ScanError::InvalidParameter`].
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }
}
