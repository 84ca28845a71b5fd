//! ObservationScope for begin/complete logging around a run
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` on `complete()`
//! - Logs `{name}_FAILED` on `fail()`
//! - Logs `{name}_INCOMPLETE` when dropped without either

use std::time::Instant;

use super::logger::Logger;

/// A scope that logs begin and completion of one unit of work
pub struct ObservationScope {
    name: String,
    fields: Vec<(String, String)>,
    started: Instant,
    finished: bool,
}

impl ObservationScope {
    /// Create a new scope; logs `{name}_BEGIN` immediately.
    pub fn new(name: &str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a scope whose fields are repeated on every line it logs.
    pub fn with_fields(name: &str, fields: &[(&str, &str)]) -> Self {
        Logger::info(&format!("{}_BEGIN", name), fields);
        Self {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            started: Instant::now(),
            finished: false,
        }
    }

    /// Milliseconds since the scope began.
    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    /// Mark the scope complete, appending `extra` fields and `elapsed_ms`.
    pub fn complete(mut self, extra: &[(&str, &str)]) {
        self.finished = true;
        let elapsed = self.elapsed_ms().to_string();
        let mut fields = self.borrowed_fields();
        fields.extend(extra.iter().copied());
        fields.push(("elapsed_ms", elapsed.as_str()));
        Logger::info(&format!("{}_COMPLETE", self.name), &fields);
    }

    /// Mark the scope failed at FATAL severity.
    pub fn fail(mut self, reason: &str) {
        self.finished = true;
        let mut fields = self.borrowed_fields();
        fields.push(("reason", reason));
        Logger::fatal(&format!("{}_FAILED", self.name), &fields);
    }

    fn borrowed_fields(&self) -> Vec<(&str, &str)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_complete() {
        let scope = ObservationScope::with_fields("IMPORT", &[("run_id", "r1")]);
        scope.complete(&[("nodes", "3")]);
    }

    #[test]
    fn test_scope_fail() {
        let scope = ObservationScope::new("RESOLVE");
        scope.fail("checkpoint truncated");
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::new("RESOLVE");
        drop(scope);
    }
}
