// Job submission: one worker task per job, one job at a time

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::info;

use super::errors::SubmitError;
use super::models::{CancelFlag, DownloadJob, DownloadRequest, JobOutcome};
use super::orchestrator::Orchestrator;
use super::traits::EventSink;

/// Accepts download requests and runs each on its own tokio task.
///
/// Overlapping jobs are rejected with [`SubmitError::Busy`].
pub struct DownloadManager {
    orchestrator: Arc<Orchestrator>,
    active: Arc<AtomicBool>,
}

impl DownloadManager {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a job. Must be called from within a tokio runtime.
    ///
    /// The busy slot is released right before the terminal notification is
    /// delivered, so a sink reacting to it can submit the next job.
    pub fn submit(
        &self,
        request: DownloadRequest,
        sink: Arc<dyn EventSink>,
    ) -> Result<JobHandle, SubmitError> {
        validate(&request)?;

        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SubmitError::Busy);
        }
        let slot = ActiveSlot(self.active.clone());

        info!(url = %request.url, mode = %request.mode, quality = %request.quality, "job submitted");

        let cancel = CancelFlag::new();
        let mut job = DownloadJob::new(request, cancel.clone());
        let orchestrator = self.orchestrator.clone();

        let task = tokio::spawn(async move {
            let outcome = orchestrator.execute(&mut job, sink.as_ref()).await;
            drop(slot);
            sink.on_terminal(&outcome);
            outcome
        });

        Ok(JobHandle { cancel, task })
    }
}

fn validate(request: &DownloadRequest) -> Result<(), SubmitError> {
    if request.url.trim().is_empty() {
        return Err(SubmitError::EmptyUrl);
    }
    if request.output_directory.as_os_str().is_empty() {
        return Err(SubmitError::MissingOutputDirectory);
    }
    Ok(())
}

/// Clears the busy flag when the worker finishes, panics included
struct ActiveSlot(Arc<AtomicBool>);

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Caller's side of a running job
pub struct JobHandle {
    cancel: CancelFlag,
    task: JoinHandle<JobOutcome>,
}

impl JobHandle {
    /// Request cancellation. Returns false if it was already requested.
    pub fn cancel(&self) -> bool {
        let first = self.cancel.request();
        if first {
            info!("download cancellation requested");
        }
        first
    }

    /// Flag to hand to other parts of the UI, e.g. a signal handler
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal outcome
    pub async fn wait(self) -> Result<JobOutcome, JoinError> {
        self.task.await
    }
}
