// Orchestrator: preflight, then up to MAX_RETRIES attempts of yt-dlp
//
// Idle -> Checking -> Attempting -> Succeeded | Cancelled | Failed
//
// The preflight runs once per job. Every attempt rebuilds its arguments and
// owns exactly one process, which is reaped before the next attempt starts.
// Cancellation is polled once per output line.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::DownloadError;
use super::models::{CancelFlag, DownloadJob, JobOutcome, ProgressEvent, MAX_RETRIES};
use super::process::SystemLauncher;
use super::tools::check_tool;
use super::traits::{EventSink, ProcessLauncher};
use crate::config::FetchConfig;
use crate::ytdlp::{build_download_args, error_message, parse_progress};

/// Result of a single attempt, before the retry decision
#[derive(Debug)]
enum AttemptResult {
    Succeeded,
    Cancelled,
    Failed(DownloadError),
}

pub struct Orchestrator {
    launcher: Arc<dyn ProcessLauncher>,
    config: FetchConfig,
}

impl Orchestrator {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, config: FetchConfig) -> Self {
        Self { launcher, config }
    }

    /// Orchestrator that starts real processes
    pub fn with_system_launcher(config: FetchConfig) -> Self {
        Self::new(Arc::new(SystemLauncher::new()), config)
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Drive `job` to a terminal state and deliver the terminal notification.
    pub async fn run(&self, job: &mut DownloadJob, sink: &dyn EventSink) -> JobOutcome {
        let outcome = self.execute(job, sink).await;
        sink.on_terminal(&outcome);
        outcome
    }

    /// Drive `job` to a terminal state without the terminal notification;
    /// the caller owns delivering it.
    pub async fn execute(&self, job: &mut DownloadJob, sink: &dyn EventSink) -> JobOutcome {
        let outcome = self.drive(job, sink).await;
        job.state = outcome.state();

        match &outcome {
            JobOutcome::Succeeded => {
                info!(url = %job.request.url, attempts = job.attempt_count, "download succeeded")
            }
            JobOutcome::Cancelled => {
                info!(url = %job.request.url, attempts = job.attempt_count, "download cancelled")
            }
            JobOutcome::Failed(e) => {
                warn!(url = %job.request.url, attempts = job.attempt_count, error = %e, "download failed")
            }
        }
        outcome
    }

    async fn drive(&self, job: &mut DownloadJob, sink: &dyn EventSink) -> JobOutcome {
        sink.on_log("Starting download...");

        match check_tool(
            self.launcher.as_ref(),
            &self.config.program,
            self.config.version_timeout,
        )
        .await
        {
            Ok(version) => sink.on_log(&format!("Using yt-dlp version: {}", version)),
            Err(e) => {
                sink.on_log(&format!("Error: {}", e));
                return JobOutcome::Failed(e);
            }
        }

        loop {
            if job.cancel.is_requested() {
                sink.on_log("Download cancelled by user.");
                return JobOutcome::Cancelled;
            }

            // Rebuilt every attempt; the template is deterministic
            let args = match build_download_args(&job.request) {
                Ok(args) => args,
                Err(e) => {
                    sink.on_log(&format!("Error: {}", e));
                    return JobOutcome::Failed(e);
                }
            };

            job.attempt_count += 1;
            debug!(attempt = job.attempt_count, max = MAX_RETRIES, ?args, "starting attempt");
            if job.request.is_playlist() {
                sink.on_log(&format!("Processing playlist: {}", job.request.url));
            } else {
                sink.on_log(&format!("Processing video: {}", job.request.url));
            }

            match self.attempt(&args, &job.cancel, sink).await {
                AttemptResult::Succeeded => {
                    sink.on_log("Download completed!");
                    return JobOutcome::Succeeded;
                }
                AttemptResult::Cancelled => {
                    sink.on_log("Download cancelled by user.");
                    return JobOutcome::Cancelled;
                }
                AttemptResult::Failed(e) => {
                    warn!(attempt = job.attempt_count, error = %e, "attempt failed");

                    if job.attempt_count >= MAX_RETRIES {
                        sink.on_log(&format!("{}. Giving up after {} attempts.", e, MAX_RETRIES));
                        return JobOutcome::Failed(e);
                    }

                    sink.on_log(&format!(
                        "{}. Retrying ({}/{})...",
                        e, job.attempt_count, MAX_RETRIES
                    ));
                    if !self.config.retry_delay.is_zero() {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }
    }

    /// One invocation of the tool. The process handle never outlives this call.
    async fn attempt(
        &self,
        args: &[String],
        cancel: &CancelFlag,
        sink: &dyn EventSink,
    ) -> AttemptResult {
        let mut process = match self.launcher.launch(&self.config.program, args) {
            Ok(process) => process,
            Err(e) => return AttemptResult::Failed(e),
        };

        let mut last_error: Option<String> = None;
        while let Some(line) = process.next_line().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    process.terminate();
                    let _ = process.wait().await;
                    return AttemptResult::Failed(DownloadError::StreamRead(e.to_string()));
                }
            };

            if cancel.is_requested() {
                debug!("cancellation observed, terminating tool");
                process.terminate();
                let _ = process.wait().await;
                return AttemptResult::Cancelled;
            }

            sink.on_log(&line);
            if let Some(percent) = parse_progress(&line) {
                sink.on_progress(ProgressEvent { percent });
            }
            if let Some(message) = error_message(&line) {
                last_error = Some(message.to_string());
            }
        }

        let code = match process.wait().await {
            Ok(code) => code,
            Err(e) => return AttemptResult::Failed(DownloadError::StreamRead(e.to_string())),
        };

        if code == 0 {
            AttemptResult::Succeeded
        } else if cancel.is_requested() {
            AttemptResult::Cancelled
        } else {
            AttemptResult::Failed(DownloadError::NonZeroExit {
                code,
                detail: last_error,
            })
        }
    }
}
