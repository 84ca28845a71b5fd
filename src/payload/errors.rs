//! Payload decode errors
//!
//! Always recoverable: the driver logs the failure and skips the node.

use thiserror::Error;

/// Result type for payload decoding
pub type PayloadResult<T> = Result<T, PayloadError>;

/// Payload decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Empty payload")]
    Empty,

    #[error("Unsupported payload encoding version: {0}")]
    UnsupportedVersion(u16),

    #[error("Unexpected encoding type: {found} (expected {expected})")]
    WrongType { found: u8, expected: u8 },

    #[error("Payload truncated while reading {0}")]
    Truncated(&'static str),

    #[error("Trailing bytes after {0}: {1}")]
    TrailingBytes(&'static str, usize),

    #[error("Key has {0} parts, owner/controller/key required")]
    MissingKeyParts(usize),
}

impl PayloadError {
    /// Stable code for log lines
    pub fn code(&self) -> &'static str {
        match self {
            PayloadError::Empty => "MIGRATE_PAYLOAD_EMPTY",
            PayloadError::UnsupportedVersion(_) => "MIGRATE_PAYLOAD_UNSUPPORTED_VERSION",
            PayloadError::WrongType { .. } => "MIGRATE_PAYLOAD_WRONG_TYPE",
            PayloadError::Truncated(_) => "MIGRATE_PAYLOAD_TRUNCATED",
            PayloadError::TrailingBytes(..) => "MIGRATE_PAYLOAD_TRAILING_BYTES",
            PayloadError::MissingKeyParts(_) => "MIGRATE_PAYLOAD_MISSING_KEY_PARTS",
        }
    }
}
