//! Checkpoint-to-store migration
//!
//! Two routines share one driver:
//! - `Import` copies every register with a path into the store, raw
//! - `Resolve` writes plain registers and materializes object-storage
//!   values through the slab resolver, reading slabs from the store
//!
//! Running `Import` before `Resolve` on the same store makes every root
//! register and slab visible to the resolver regardless of checkpoint order.

mod driver;
mod errors;
mod progress;
mod report;

use std::path::Path;

use crate::checkpoint::CheckpointReader;
use crate::observability::{log_event, Event};
use crate::store::LedgerStore;

pub use driver::MigrationDriver;
pub use errors::{MigrationError, MigrationErrorCode, MigrationResult};
pub use progress::{Progress, ProgressTracker, DEFAULT_PROGRESS_INTERVAL};
pub use report::{MigrationMode, MigrationReport, MigrationStats, TerminalState};

/// Options for one run
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub mode: MigrationMode,
    pub progress_interval: u64,
    pub persist_resolved: bool,
}

impl MigrationOptions {
    pub fn new(mode: MigrationMode) -> Self {
        Self {
            mode,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            persist_resolved: false,
        }
    }
}

/// Opens the store, then the checkpoint, and runs the migration.
///
/// Opening failures are returned as errors; an aborted walk returns a
/// report in the `Aborted` state.
pub fn run_migration(
    checkpoint_path: &Path,
    store_path: &Path,
    options: &MigrationOptions,
) -> MigrationResult<MigrationReport> {
    let store = match LedgerStore::open(store_path) {
        Ok(store) => store,
        Err(err) => {
            log_event(
                Event::StoreOpenFailed,
                &[("code", err.code().code()), ("reason", err.message())],
            );
            return Err(err.into());
        }
    };
    let path = store_path.display().to_string();
    log_event(Event::StoreOpened, &[("path", path.as_str())]);

    let reader = CheckpointReader::open(checkpoint_path)?;

    Ok(MigrationDriver::new(&store, options.mode)
        .with_progress_interval(options.progress_interval)
        .with_persist_resolved(options.persist_resolved)
        .run(reader))
}
