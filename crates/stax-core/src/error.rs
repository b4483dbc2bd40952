//! Error types for the StaxDB client
//!
//! Every failure is raised at the call that detected it. Nothing in the
//! client retries; callers decide whether to rebuild a plan or reopen a
//! database.

use thiserror::Error;

/// The main error type for StaxDB client operations
#[derive(Error, Debug)]
pub enum Error {
    // ========== Usage Errors ==========
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    // ========== Protocol Errors ==========
    #[error("Failed to compile query plan: {0}")]
    Compilation(String),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // ========== State Errors ==========
    #[error("Result set has been closed")]
    CursorClosed,

    #[error("Database is not open")]
    DatabaseClosed,

    #[error("Database is already open")]
    AlreadyOpen,

    #[error("Transaction is already {0}")]
    TransactionClosed(String),

    // ========== Engine Errors ==========
    #[error("Engine error: {0}")]
    Engine(String),

    // ========== Serialization Errors ==========
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ========== IO Errors ==========
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for StaxDB client operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if the caller passed malformed input
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidCriteria(_)
                | Error::InvalidArgument(_)
                | Error::TypeMismatch { .. }
                | Error::InvalidBatch(_)
        )
    }

    /// Returns true if the engine broke its side of the contract
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Error::Compilation(_) | Error::Execution(_) | Error::Protocol(_)
        )
    }

    /// Returns true if a handle was used after it was closed or completed
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Error::CursorClosed
                | Error::DatabaseClosed
                | Error::AlreadyOpen
                | Error::TransactionClosed(_)
        )
    }

    /// Shorthand for a type mismatch on a named argument
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
