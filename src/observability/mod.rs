//! Observability for migration runs
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Begin/complete scopes
//!
//! Observability is read-only: a logging failure never changes the outcome
//! of a run.

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event at INFO, or FATAL for fatal events.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log a skipped node or value at WARN.
pub fn log_skip(event: Event, fields: &[(&str, &str)]) {
    Logger::warn(event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::ConfigLoaded, &[("source", "defaults")]);
        log_event(Event::MigrationAborted, &[("reason", "truncated")]);
    }

    #[test]
    fn test_log_skip() {
        log_skip(Event::PayloadDecodeFailed, &[("node", "7")]);
    }
}
