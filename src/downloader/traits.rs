// Seams between the orchestrator, the OS process layer and the UI

use async_trait::async_trait;
use std::io;
use tokio::sync::mpsc;

use super::errors::DownloadError;
use super::models::{JobOutcome, ProgressEvent};

/// Starts external processes
pub trait ProcessLauncher: Send + Sync {
    /// Start `program` with `args` (no shell), stdout and stderr merged.
    fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn ProcessHandle>, DownloadError>;
}

/// Ownership of one running external process
#[async_trait]
pub trait ProcessHandle: Send {
    /// Next line of merged output; `None` once both streams are closed.
    async fn next_line(&mut self) -> Option<io::Result<String>>;

    /// Forcibly stop the process. Idempotent, and a no-op after exit.
    fn terminate(&mut self);

    /// Block until the process has exited and return its exit code.
    async fn wait(&mut self) -> io::Result<i32>;
}

/// Receives everything a job reports outward.
///
/// Implementations must not assume which thread calls them.
pub trait EventSink: Send + Sync {
    fn on_log(&self, line: &str);

    fn on_progress(&self, progress: ProgressEvent);

    /// Called exactly once per job
    fn on_terminal(&self, outcome: &JobOutcome);
}

/// Everything a job can publish, as one message type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Log(String),
    Progress(ProgressEvent),
    Terminal(JobOutcome),
}

/// Event sink that forwards into a tokio channel, for UIs owning an event loop
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<JobEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<JobEvent>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn emit(&self, event: JobEvent) {
        // A dropped receiver means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

impl EventSink for ChannelSink {
    fn on_log(&self, line: &str) {
        self.emit(JobEvent::Log(line.to_string()));
    }

    fn on_progress(&self, progress: ProgressEvent) {
        self.emit(JobEvent::Progress(progress));
    }

    fn on_terminal(&self, outcome: &JobOutcome) {
        self.emit(JobEvent::Terminal(outcome.clone()));
    }
}
