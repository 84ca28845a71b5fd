//! Migration error types
//!
//! Error codes:
//! - MIGRATE_CHECKPOINT_UNAVAILABLE (FATAL)
//! - MIGRATE_STORE_UNAVAILABLE (FATAL)
//! - MIGRATE_ABORTED (FATAL)
//!
//! Per-node failures never surface here; the driver logs and skips them.

use std::fmt;

use crate::checkpoint::CheckpointError;
use crate::error::Severity;
use crate::store::StoreError;

/// Migration error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationErrorCode {
    /// Checkpoint file could not be opened
    CheckpointUnavailable,
    /// Output store could not be opened
    StoreUnavailable,
    /// Run stopped before all nodes were processed
    Aborted,
}

impl MigrationErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            MigrationErrorCode::CheckpointUnavailable => "MIGRATE_CHECKPOINT_UNAVAILABLE",
            MigrationErrorCode::StoreUnavailable => "MIGRATE_STORE_UNAVAILABLE",
            MigrationErrorCode::Aborted => "MIGRATE_ABORTED",
        }
    }

    /// Every migration-level error ends the run
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for MigrationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Migration error with context
#[derive(Debug)]
pub struct MigrationError {
    code: MigrationErrorCode,
    message: String,
    node_index: Option<u64>,
    source: Option<Box<dyn std::error::Error + 'static>>,
}

impl MigrationError {
    /// Run stopped at `node_index` (0 when the header could not be read)
    pub fn aborted(node_index: u64, message: impl Into<String>) -> Self {
        Self {
            code: MigrationErrorCode::Aborted,
            message: message.into(),
            node_index: Some(node_index),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> MigrationErrorCode {
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

    /// Node the run stopped at, if any
    pub fn node_index(&self) -> Option<u64> {
        self.node_index
    }
}

impl From<CheckpointError> for MigrationError {
    fn from(err: CheckpointError) -> Self {
        Self {
            code: MigrationErrorCode::CheckpointUnavailable,
            message: err.to_string(),
            node_index: err.node_index(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<StoreError> for MigrationError {
    fn from(err: StoreError) -> Self {
        Self {
            code: MigrationErrorCode::StoreUnavailable,
            message: err.to_string(),
            node_index: None,
            source: Some(Box::new(err)),
        }
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(index) = self.node_index {
            write!(f, " (node: {})", index)?;
        }
        Ok(())
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref()
    }
}

/// Result type for migration runs
pub type MigrationResult<T> = Result<T, MigrationError>;
