//! Store error types
//!
//! Error codes:
//! - MIGRATE_STORE_OPEN_FAILED (FATAL)
//! - MIGRATE_STORE_READ_FAILED (ERROR)
//! - MIGRATE_STORE_WRITE_FAILED (ERROR)
//!
//! Only opening the store aborts a run; a failed lookup or write skips the
//! current node.

use std::fmt;

use crate::error::Severity;

/// Store error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Database could not be created or opened
    OpenFailed,
    /// Read transaction or lookup failed
    ReadFailed,
    /// Write transaction, insert or commit failed
    WriteFailed,
}

impl StoreErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::OpenFailed => "MIGRATE_STORE_OPEN_FAILED",
            StoreErrorCode::ReadFailed => "MIGRATE_STORE_READ_FAILED",
            StoreErrorCode::WriteFailed => "MIGRATE_STORE_WRITE_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StoreErrorCode::OpenFailed => Severity::Fatal,
            StoreErrorCode::ReadFailed => Severity::Error,
            StoreErrorCode::WriteFailed => Severity::Error,
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Store error with context
#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    details: Option<String>,
    source: redb::Error,
}

impl StoreError {
    fn new(code: StoreErrorCode, message: impl Into<String>, source: redb::Error) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source,
        }
    }

    /// Database could not be opened (FATAL)
    pub fn open_failed(message: impl Into<String>, source: impl Into<redb::Error>) -> Self {
        Self::new(StoreErrorCode::OpenFailed, message, source.into())
    }

    /// Lookup failed
    pub fn read_failed(message: impl Into<String>, source: impl Into<redb::Error>) -> Self {
        Self::new(StoreErrorCode::ReadFailed, message, source.into())
    }

    /// Write failed
    pub fn write_failed(message: impl Into<String>, source: impl Into<redb::Error>) -> Self {
        Self::new(StoreErrorCode::WriteFailed, message, source.into())
    }

    /// Attach the key the operation was working on
    pub fn with_key(mut self, key: &[u8]) -> Self {
        self.details = Some(format!("key: {}", hex::encode(key)));
        self
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether this error stops the run
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        write!(f, ": {}", self.source)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
