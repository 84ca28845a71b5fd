//! Migration driver
//!
//! Walks the checkpoint node by node and routes each register:
//!
//! 1. Read node i; a truncated or malformed record aborts the run
//! 2. No path: skip
//! 3. Decode payload; failure is logged and skipped
//! 4. Import mode: write `owner ‖ path -> value`
//! 5. Resolve mode: plain paths are written raw, object-storage paths are
//!    resolved through the slab resolver and reported
//!
//! The driver is the only error boundary for per-node failures. Nothing
//! past it sees a payload, slab or write error; only the checkpoint itself
//! can end a run early.

use std::io::Read;

use chrono::Utc;
use crc32fast::Hasher;
use uuid::Uuid;

use crate::checkpoint::{CheckpointError, CheckpointReader, StorableNode};
use crate::namespace::{self, PathClass};
use crate::observability::{log_event, log_skip, Event, Logger, ObservationScope, Severity};
use crate::payload::{decode_payload, LogicalKey};
use crate::slab::SlabResolver;
use crate::store::{LedgerStore, RegisterSink};

use super::progress::{ProgressTracker, DEFAULT_PROGRESS_INTERVAL};
use super::report::{MigrationMode, MigrationReport, MigrationStats, TerminalState};

/// Drives one checkpoint into one sink
pub struct MigrationDriver<'a, S: RegisterSink + ?Sized = LedgerStore> {
    store: &'a S,
    mode: MigrationMode,
    progress_interval: u64,
    persist_resolved: bool,
}

/// Mutable state of a single run
struct RunState {
    stats: MigrationStats,
    digest: Hasher,
}

impl<'a, S: RegisterSink + ?Sized> MigrationDriver<'a, S> {
    pub fn new(store: &'a S, mode: MigrationMode) -> Self {
        Self {
            store,
            mode,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            persist_resolved: false,
        }
    }

    /// Nodes between progress lines
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Also write resolved values into the `resolved` table
    pub fn with_persist_resolved(mut self, persist: bool) -> Self {
        self.persist_resolved = persist;
        self
    }

    /// Runs the migration to a terminal state.
    pub fn run<R: Read>(&self, mut reader: CheckpointReader<R>) -> MigrationReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let run_id_str = run_id.to_string();
        let scope = ObservationScope::with_fields(
            "MIGRATION",
            &[("mode", self.mode.as_str()), ("run_id", run_id_str.as_str())],
        );

        let mut state = RunState {
            stats: MigrationStats::default(),
            digest: Hasher::new(),
        };

        let (node_count, failure) = match reader.read_header() {
            Ok(header) => {
                let count = header.node_count.to_string();
                log_event(Event::HeaderRead, &[("node_count", count.as_str())]);
                let failure = self.drive(&mut reader, header.node_count, &mut state);
                (header.node_count, failure)
            }
            Err(err) => (0, Some(err)),
        };

        state.stats.write_digest = state.digest.finalize();

        let report = MigrationReport {
            run_id,
            mode: self.mode,
            started_at,
            finished_at: Utc::now(),
            state: if failure.is_some() {
                TerminalState::Aborted
            } else {
                TerminalState::Completed
            },
            node_count,
            stats: state.stats,
            abort_reason: failure.as_ref().map(|e| e.to_string()),
            aborted_at: failure.as_ref().map(|e| e.node_index().unwrap_or(0)),
        };

        let processed = report.stats.nodes_processed.to_string();
        match failure {
            None => {
                let written = report.stats.registers_written.to_string();
                let resolved = report.stats.values_resolved.to_string();
                log_event(
                    Event::MigrationCompleted,
                    &[
                        ("processed", processed.as_str()),
                        ("resolved", resolved.as_str()),
                        ("written", written.as_str()),
                    ],
                );
                scope.complete(&[("processed", processed.as_str())]);
            }
            Some(err) => {
                let at = report.aborted_at.unwrap_or(0).to_string();
                log_event(
                    Event::MigrationAborted,
                    &[
                        ("code", err.code().code()),
                        ("node", at.as_str()),
                        ("processed", processed.as_str()),
                        ("reason", err.message()),
                    ],
                );
                scope.fail(err.code().code());
            }
        }

        report
    }

    /// Processes every node; returns the error that stopped the walk.
    fn drive<R: Read>(
        &self,
        reader: &mut CheckpointReader<R>,
        node_count: u64,
        state: &mut RunState,
    ) -> Option<CheckpointError> {
        let progress = ProgressTracker::new(self.progress_interval, node_count);

        loop {
            match reader.next_node() {
                Ok(Some(node)) => {
                    state.stats.nodes_processed += 1;
                    let index = state.stats.nodes_processed;
                    self.process_node(index, &node, state);
                    progress.observe(index);
                }
                Ok(None) => return None,
                Err(err) => return Some(err),
            }
        }
    }

    fn process_node(&self, index: u64, node: &StorableNode, state: &mut RunState) {
        if !node.has_path() {
            state.stats.pathless += 1;
            return;
        }
        state.stats.leaves += 1;

        let decoded = decode_payload(&node.encoded_payload)
            .and_then(|payload| payload.logical_key().map(|key| (key, payload.value)));
        let (key, value) = match decoded {
            Ok(decoded) => decoded,
            Err(err) => {
                state.stats.decode_failures += 1;
                let node_str = index.to_string();
                let reason = err.to_string();
                log_skip(
                    Event::PayloadDecodeFailed,
                    &[
                        ("code", err.code()),
                        ("node", node_str.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
                return;
            }
        };

        match self.mode {
            MigrationMode::Import => self.write_register(&key, &value, state),
            MigrationMode::Resolve => match namespace::classify(&key.path) {
                PathClass::Plain => self.write_register(&key, &value, state),
                PathClass::ObjectStorage => self.resolve_value(&key, state),
            },
        }
    }

    fn write_register(&self, key: &LogicalKey, value: &[u8], state: &mut RunState) {
        let full_key = key.storage_key();
        match self.store.put_register(&full_key, value) {
            Ok(()) => {
                state.stats.registers_written += 1;
                state
                    .digest
                    .update(&(full_key.len() as u64).to_be_bytes());
                state.digest.update(&full_key);
                state.digest.update(&(value.len() as u64).to_be_bytes());
                state.digest.update(value);

                if Logger::enabled(Severity::Trace) {
                    let owner = hex::encode(&key.owner);
                    let path = key.display_path();
                    Logger::trace(
                        Event::RegisterWritten.as_str(),
                        &[("owner", owner.as_str()), ("path", path.as_str())],
                    );
                }
            }
            Err(err) => {
                state.stats.write_failures += 1;
                let owner = hex::encode(&key.owner);
                let path = key.display_path();
                let reason = err.to_string();
                log_skip(
                    Event::RegisterWriteFailed,
                    &[
                        ("code", err.code().code()),
                        ("owner", owner.as_str()),
                        ("path", path.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
            }
        }
    }

    fn resolve_value(&self, key: &LogicalKey, state: &mut RunState) {
        let owner = hex::encode(&key.owner);
        let path = key.display_path();

        let value = match SlabResolver::new(self.store).read_value(&key.owner, &key.path) {
            Ok(value) => value,
            Err(err) => {
                state.stats.resolve_failures += 1;
                let reason = err.to_string();
                let fields = [
                    ("code", err.code()),
                    ("owner", owner.as_str()),
                    ("path", path.as_str()),
                    ("reason", reason.as_str()),
                ];
                if err.is_not_found() {
                    Logger::trace(Event::ValueResolveFailed.as_str(), &fields);
                } else {
                    log_skip(Event::ValueResolveFailed, &fields);
                }
                return;
            }
        };

        state.stats.values_resolved += 1;
        let rendered = value.to_string();
        log_event(
            Event::ValueResolved,
            &[
                ("owner", owner.as_str()),
                ("path", path.as_str()),
                ("value", rendered.as_str()),
            ],
        );

        if !self.persist_resolved {
            return;
        }

        let persisted = serde_json::to_vec(&value)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.store
                    .put_resolved(&key.storage_key(), &json)
                    .map_err(|e| e.to_string())
            });
        match persisted {
            Ok(()) => state.stats.resolved_persisted += 1,
            Err(reason) => log_skip(
                Event::ResolvedPersistFailed,
                &[
                    ("owner", owner.as_str()),
                    ("path", path.as_str()),
                    ("reason", reason.as_str()),
                ],
            ),
        }
    }
}
