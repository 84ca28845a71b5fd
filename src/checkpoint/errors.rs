//! Checkpoint reader error types
//!
//! Error codes:
//! - MIGRATE_CHECKPOINT_OPEN_FAILED (FATAL)
//! - MIGRATE_CHECKPOINT_TRUNCATED (FATAL)
//! - MIGRATE_CHECKPOINT_END_OF_STREAM (FATAL)
//! - MIGRATE_CHECKPOINT_MALFORMED (FATAL)
//!
//! Checkpoints are assumed consistent: a partial or damaged file is never a
//! resumable state, so every reader error aborts the run.

use std::fmt;
use std::io;

use crate::error::Severity;

/// Checkpoint error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointErrorCode {
    /// Checkpoint file could not be opened
    OpenFailed,
    /// Header shorter than its fixed size
    Truncated,
    /// Stream ended before `node_count` records were read
    EndOfStream,
    /// Record present but not decodable
    Malformed,
}

impl CheckpointErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            CheckpointErrorCode::OpenFailed => "MIGRATE_CHECKPOINT_OPEN_FAILED",
            CheckpointErrorCode::Truncated => "MIGRATE_CHECKPOINT_TRUNCATED",
            CheckpointErrorCode::EndOfStream => "MIGRATE_CHECKPOINT_END_OF_STREAM",
            CheckpointErrorCode::Malformed => "MIGRATE_CHECKPOINT_MALFORMED",
        }
    }

    /// All checkpoint errors abort the migration
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for CheckpointErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Checkpoint error with context
#[derive(Debug)]
pub struct CheckpointError {
    code: CheckpointErrorCode,
    message: String,
    /// 1-based node index, when the failure happened inside a record
    node_index: Option<u64>,
    source: Option<io::Error>,
}

impl CheckpointError {
    fn new(code: CheckpointErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            node_index: None,
            source: None,
        }
    }

    /// Checkpoint file could not be opened
    pub fn open_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(CheckpointErrorCode::OpenFailed, message)
        }
    }

    /// Header could not be read in full
    pub fn truncated(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(CheckpointErrorCode::Truncated, message)
        }
    }

    /// Short read inside node record `node_index`
    pub fn end_of_stream(node_index: u64, source: io::Error) -> Self {
        Self {
            node_index: Some(node_index),
            source: Some(source),
            ..Self::new(
                CheckpointErrorCode::EndOfStream,
                "checkpoint ended before all node records were read",
            )
        }
    }

    /// Node record `node_index` is not decodable
    pub fn malformed(node_index: u64, message: impl Into<String>) -> Self {
        Self {
            node_index: Some(node_index),
            ..Self::new(CheckpointErrorCode::Malformed, message)
        }
    }

    /// Maps a record read failure onto the right code.
    pub(crate) fn from_record_io(node_index: u64, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::end_of_stream(node_index, err)
        } else {
            Self {
                node_index: Some(node_index),
                message: format!("failed to read node record: {}", err),
                source: Some(err),
                code: CheckpointErrorCode::Malformed,
            }
        }
    }

    /// Returns the error code
    pub fn code(&self) -> CheckpointErrorCode {
        self.code
    }

    /// Returns the severity
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Always true: checkpoint errors abort the run
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Returns the message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the node index the failure happened at, if any
    pub fn node_index(&self) -> Option<u64> {
        self.node_index
    }
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        if let Some(index) = self.node_index {
            write!(f, " (node: {})", index)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for CheckpointError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for checkpoint reads
pub type CheckpointResult<T> = Result<T, CheckpointError>;
