/*!
 * Progress reporting and cooperative cancellation
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, TreeDocError};
use crate::types::PipelineError;

/// Receives the progress, error and completion stream of one pipeline run
pub trait ProgressReporter: Send + Sync {
    /// Called with a percentage in `0..=100` after each processed entry
    fn progress(&self, percent: u8);

    /// Called for every non-fatal per-entry error
    fn entry_error(&self, error: &PipelineError) {
        tracing::warn!("{}", error);
    }

    /// Terminal success signal
    fn succeeded(&self) {}

    /// Terminal failure signal
    fn failed(&self, _error: &TreeDocError) {}
}

// Implement ProgressReporter for closures
impl<F> ProgressReporter for F
where
    F: Fn(u8) + Send + Sync,
{
    fn progress(&self, percent: u8) {
        self(percent)
    }
}

/// Reporter that discards progress (errors still go to the log)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn progress(&self, _percent: u8) {}
}

/// Turns processed/total counts into a monotonic percentage stream
///
/// The denominator is fixed at construction. A zero total short-circuits to
/// 100 immediately. Overshoot (more entries than counted) is clamped and
/// [`ProgressTracker::finish`] guarantees the final value is 100.
pub struct ProgressTracker<'a> {
    reporter: &'a dyn ProgressReporter,
    total: u64,
    processed: u64,
    last: Option<u8>,
}

impl<'a> ProgressTracker<'a> {
    /// Create a tracker for `total` entries
    pub fn new(reporter: &'a dyn ProgressReporter, total: u64) -> Self {
        let mut tracker = Self {
            reporter,
            total,
            processed: 0,
            last: None,
        };
        if total == 0 {
            tracker.emit(100);
        }
        tracker
    }

    /// Record one processed entry and emit the new percentage
    pub fn advance(&mut self) {
        self.processed += 1;
        let percent = if self.total == 0 {
            100
        } else {
            (self.processed.saturating_mul(100) / self.total).min(100) as u8
        };
        self.emit(percent);
    }

    /// Forward a per-entry error to the reporter
    pub fn error(&self, error: &PipelineError) {
        self.reporter.entry_error(error);
    }

    /// Make sure the stream ends at 100
    pub fn finish(&mut self) {
        if self.processed != self.total && self.total != 0 {
            tracing::warn!(
                "Tree changed during the run: processed {} of {} counted entries",
                self.processed,
                self.total
            );
        }
        if self.last != Some(100) {
            self.emit(100);
        }
    }

    fn emit(&mut self, percent: u8) {
        let percent = self.last.map_or(percent, |last| percent.max(last));
        self.last = Some(percent);
        self.reporter.progress(percent);
    }
}

/// Cooperative cancellation flag shared between a caller and a worker
///
/// Workers check it between entries, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Return `Err(Cancelled)` once cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(TreeDocError::Cancelled);
        }
        Ok(())
    }
}
