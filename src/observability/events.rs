//! Observable migration events
//!
//! Events are explicit and typed; each maps to one stable log name.

use std::fmt;

/// Observable events during a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration resolved (file or defaults)
    ConfigLoaded,
    /// Output store opened
    StoreOpened,
    /// Output store could not be opened (FATAL)
    StoreOpenFailed,
    /// Checkpoint header read
    HeaderRead,
    /// Coarse progress indicator
    Progress,
    /// Run finished with all nodes processed
    MigrationCompleted,
    /// Run stopped on a truncated or malformed checkpoint (FATAL)
    MigrationAborted,

    // Per-node outcomes
    /// Node payload could not be decoded
    PayloadDecodeFailed,
    /// Plain register written to the store
    RegisterWritten,
    /// Plain register write failed
    RegisterWriteFailed,
    /// Object-storage value resolved
    ValueResolved,
    /// Object-storage value could not be resolved
    ValueResolveFailed,
    /// Resolved value could not be persisted
    ResolvedPersistFailed,
    /// Slab register looked up by the resolver
    SlabRead,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreOpened => "STORE_OPENED",
            Event::StoreOpenFailed => "STORE_OPEN_FAILED",
            Event::HeaderRead => "CHECKPOINT_HEADER_READ",
            Event::Progress => "PROGRESS",
            Event::MigrationCompleted => "MIGRATION_COMPLETED",
            Event::MigrationAborted => "MIGRATION_ABORTED",
            Event::PayloadDecodeFailed => "PAYLOAD_DECODE_FAILED",
            Event::RegisterWritten => "REGISTER_WRITTEN",
            Event::RegisterWriteFailed => "REGISTER_WRITE_FAILED",
            Event::ValueResolved => "VALUE_RESOLVED",
            Event::ValueResolveFailed => "VALUE_RESOLVE_FAILED",
            Event::ResolvedPersistFailed => "RESOLVED_PERSIST_FAILED",
            Event::SlabRead => "SLAB_READ",
        }
    }

    /// Returns true if this event ends the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::StoreOpenFailed | Event::MigrationAborted)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_upper_snake() {
        let events = [
            Event::ConfigLoaded,
            Event::StoreOpened,
            Event::StoreOpenFailed,
            Event::HeaderRead,
            Event::Progress,
            Event::MigrationCompleted,
            Event::MigrationAborted,
            Event::PayloadDecodeFailed,
            Event::RegisterWritten,
            Event::RegisterWriteFailed,
            Event::ValueResolved,
            Event::ValueResolveFailed,
            Event::ResolvedPersistFailed,
            Event::SlabRead,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::MigrationAborted.is_fatal());
        assert!(Event::StoreOpenFailed.is_fatal());
        assert!(!Event::ValueResolveFailed.is_fatal());
        assert!(!Event::Progress.is_fatal());
    }
}
