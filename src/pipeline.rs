/*!
 * Background pipeline runs
 *
 * Each run executes on its own worker thread and talks to the caller through
 * a one-way channel of [`PipelineEvent`]s. A run always ends with exactly one
 * terminal event: [`PipelineEvent::Succeeded`] or [`PipelineEvent::Failed`].
 */

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::document::OutputFormat;
use crate::error::{Result, TreeDocError};
use crate::generator::{DocumentGenerator, GenerationSummary};
use crate::progress::{CancellationToken, ProgressReporter};
use crate::scanner::DirectoryScanner;
use crate::types::{PipelineError, ScanResult};

/// Messages sent from a worker to its caller
#[derive(Debug)]
pub enum PipelineEvent {
    /// Percentage in `0..=100`, non-decreasing within a run
    Progress(u8),
    /// A non-fatal per-entry error
    EntryError(PipelineError),
    /// The complete scan result, sent once by scan runs
    Structure(ScanResult),
    /// Generation statistics, sent once by successful generation runs
    Summary(GenerationSummary),
    /// Terminal: the run completed
    Succeeded,
    /// Terminal: the run failed or was cancelled
    Failed(String),
}

impl PipelineEvent {
    /// Whether this event ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Succeeded | PipelineEvent::Failed(_))
    }
}

/// Reporter that forwards everything into the event channel
struct ChannelReporter {
    sender: Sender<PipelineEvent>,
}

impl ChannelReporter {
    fn send(&self, event: PipelineEvent) {
        // A caller that stopped listening is not an error for the worker
        if self.sender.send(event).is_err() {
            tracing::trace!("Pipeline event dropped: receiver is gone");
        }
    }
}

impl ProgressReporter for ChannelReporter {
    fn progress(&self, percent: u8) {
        self.send(PipelineEvent::Progress(percent));
    }

    fn entry_error(&self, error: &PipelineError) {
        tracing::debug!("Entry error: {}", error);
        self.send(PipelineEvent::EntryError(error.clone()));
    }

    fn succeeded(&self) {
        self.send(PipelineEvent::Succeeded);
    }

    fn failed(&self, error: &TreeDocError) {
        self.send(PipelineEvent::Failed(error.to_string()));
    }
}

/// Everything a finished run reported, in arrival order per kind
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Progress percentages
    pub progress: Vec<u8>,
    /// Non-fatal errors
    pub errors: Vec<PipelineError>,
    /// Scan payload, for scan runs
    pub structure: Option<ScanResult>,
    /// Statistics, for generation runs
    pub summary: Option<GenerationSummary>,
    /// Failure message, if the run failed
    pub failure: Option<String>,
    /// Number of terminal events received
    pub terminal_events: usize,
}

impl RunOutcome {
    /// Whether the run ended with a success signal
    pub fn succeeded(&self) -> bool {
        self.terminal_events == 1 && self.failure.is_none()
    }

    /// Fold one event into the outcome
    pub fn record(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Progress(p) => self.progress.push(p),
            PipelineEvent::EntryError(e) => self.errors.push(e),
            PipelineEvent::Structure(s) => self.structure = Some(s),
            PipelineEvent::Summary(s) => self.summary = Some(s),
            PipelineEvent::Succeeded => self.terminal_events += 1,
            PipelineEvent::Failed(message) => {
                self.terminal_events += 1;
                self.failure = Some(message);
            }
        }
    }
}

/// Caller side of a running pipeline
pub struct PipelineHandle {
    events: Receiver<PipelineEvent>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    /// The event stream of this run
    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }

    /// Ask the worker to stop at the next entry boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the run's cancellation token
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain all events and wait for the worker to exit
    pub fn wait(mut self) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        for event in self.events.iter() {
            outcome.record(event);
        }
        self.join();
        outcome
    }

    /// Wait for the worker thread
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Pipeline worker exited abnormally");
            }
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        // Dropping a handle stops the run instead of leaking a busy worker
        if self.worker.is_some() {
            self.cancel.cancel();
            self.join();
        }
    }
}

/// Run `job` on a named worker thread, guaranteeing one terminal event
///
/// A panicking job is reported as a failure when panics unwind. Under
/// `panic = "abort"` (the release profile) the process exits instead.
fn spawn_worker<F>(name: &str, cancel: CancellationToken, job: F) -> Result<PipelineHandle>
where
    F: FnOnce(&ChannelReporter, &CancellationToken) -> Result<()> + Send + 'static,
{
    let (sender, receiver) = unbounded();
    let worker_cancel = cancel.clone();

    let worker = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let reporter = ChannelReporter { sender };
            let result = panic::catch_unwind(AssertUnwindSafe(|| job(&reporter, &worker_cancel)));

            match result {
                Ok(Ok(())) => reporter.succeeded(),
                Ok(Err(e)) => {
                    if e.is_cancelled() {
                        tracing::info!("Pipeline run cancelled");
                    } else {
                        tracing::error!("Pipeline run failed: {}", e);
                    }
                    reporter.failed(&e);
                }
                Err(_) => {
                    let error = TreeDocError::Worker("worker thread panicked".to_string());
                    reporter.failed(&error);
                }
            }
        })
        .map_err(|e| TreeDocError::Worker(format!("cannot spawn {}: {}", name, e)))?;

    Ok(PipelineHandle {
        events: receiver,
        cancel,
        worker: Some(worker),
    })
}

/// Start a scan of `root` in the background
pub fn spawn_scan(scanner: DirectoryScanner, root: PathBuf) -> Result<PipelineHandle> {
    spawn_worker("treedoc-scan", CancellationToken::new(), move |reporter, cancel| {
        let scan = scanner.scan(&root, reporter, cancel)?;
        reporter.send(PipelineEvent::Structure(scan));
        Ok(())
    })
}

/// Start generating a document for `root` in the background
///
/// The sink is opened on the worker, so an unwritable destination arrives
/// as the terminal failure event like every other fatal error.
pub fn spawn_generation(
    generator: DocumentGenerator,
    root: PathBuf,
    format: OutputFormat,
    destination: PathBuf,
) -> Result<PipelineHandle> {
    spawn_worker("treedoc-generate", CancellationToken::new(), move |reporter, cancel| {
        let sink = format.create_sink(&destination)?;
        let summary = generator.generate(&root, sink, reporter, cancel)?;
        reporter.send(PipelineEvent::Summary(summary));
        Ok(())
    })
}
