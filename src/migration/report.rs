//! Run statistics and report

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::errors::{MigrationError, MigrationResult};

/// Which routine a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationMode {
    /// Write every register with a path, raw
    Import,
    /// Write plain registers, resolve object-storage values
    Resolve,
}

impl MigrationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationMode::Import => "import",
            MigrationMode::Resolve => "resolve",
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalState {
    Completed,
    Aborted,
}

/// Counters collected while driving a checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationStats {
    /// Node records read
    pub nodes_processed: u64,
    /// Nodes carrying a path
    pub leaves: u64,
    /// Nodes without a path
    pub pathless: u64,
    /// Payloads that could not be decoded
    pub decode_failures: u64,
    /// Registers written raw
    pub registers_written: u64,
    /// Raw writes the store rejected
    pub write_failures: u64,
    /// Object-storage values materialized
    pub values_resolved: u64,
    /// Object-storage values skipped
    pub resolve_failures: u64,
    /// Resolved values written to the `resolved` table
    pub resolved_persisted: u64,
    /// CRC32 over raw writes in order
    pub write_digest: u32,
}

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub run_id: Uuid,
    pub mode: MigrationMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: TerminalState,
    /// Node count from the header; zero if the header was unreadable
    pub node_count: u64,
    pub stats: MigrationStats,
    /// Cause of an aborted run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    /// Node index the run stopped at; zero for the header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted_at: Option<u64>,
}

impl MigrationReport {
    pub fn is_completed(&self) -> bool {
        self.state == TerminalState::Completed
    }

    /// `Ok` for a completed run, `Err` carrying the abort cause otherwise.
    pub fn into_result(self) -> MigrationResult<Self> {
        match self.state {
            TerminalState::Completed => Ok(self),
            TerminalState::Aborted => Err(MigrationError::aborted(
                self.aborted_at.unwrap_or(0),
                self.abort_reason.unwrap_or_else(|| "run aborted".to_string()),
            )),
        }
    }

    /// Report as a single JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
