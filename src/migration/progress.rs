//! Coarse progress reporting
//!
//! Every `interval` nodes one line: batch number, total batches, percent.

use crate::observability::{log_event, Event};

/// Default number of nodes between progress lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 50_000;

/// One progress observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: u64,
    pub total: u64,
    /// `processed / interval`
    pub batch: u64,
    /// `total / interval`
    pub batches: u64,
    /// `processed * 100 / total`
    pub percent: u64,
}

/// Emits progress at fixed node intervals
#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker {
    interval: u64,
    total: u64,
}

impl ProgressTracker {
    /// An `interval` of zero is treated as one.
    pub fn new(interval: u64, total: u64) -> Self {
        Self {
            interval: interval.max(1),
            total,
        }
    }

    /// Progress for the node just processed, if it closes a batch.
    pub fn check(&self, processed: u64) -> Option<Progress> {
        if processed == 0 || processed % self.interval != 0 {
            return None;
        }
        let percent = if self.total == 0 {
            100
        } else {
            (processed as u128 * 100 / self.total as u128) as u64
        };
        Some(Progress {
            processed,
            total: self.total,
            batch: processed / self.interval,
            batches: self.total / self.interval,
            percent,
        })
    }

    /// Logs a progress line when `processed` closes a batch.
    pub fn observe(&self, processed: u64) -> Option<Progress> {
        let progress = self.check(processed)?;
        let batch = progress.batch.to_string();
        let batches = progress.batches.to_string();
        let percent = progress.percent.to_string();
        let processed = progress.processed.to_string();
        let total = progress.total.to_string();
        log_event(
            Event::Progress,
            &[
                ("batch", batch.as_str()),
                ("batches", batches.as_str()),
                ("percent", percent.as_str()),
                ("processed", processed.as_str()),
                ("total", total.as_str()),
            ],
        );
        Some(progress)
    }
}
