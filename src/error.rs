//! Severity shared by the subsystem error types
//!
//! - ERROR: the current node or value is skipped, the run continues
//! - FATAL: the run stops

use std::fmt;

/// Severity levels for subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, migration continues
    Error,
    /// Migration must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}
