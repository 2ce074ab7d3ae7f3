// Downloader module - runs yt-dlp jobs with progress, cancellation and retry

pub mod errors;
pub mod jobs;
pub mod models;
pub mod orchestrator;
pub mod process;
pub mod tools;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{DownloadError, SubmitError};
pub use jobs::{DownloadManager, JobHandle};
pub use models::{
    CancelFlag, DownloadJob, DownloadMode, DownloadRequest, JobOutcome, JobState, ProgressEvent,
    Quality, MAX_RETRIES,
};
pub use orchestrator::Orchestrator;
pub use process::SystemLauncher;
pub use tools::check_tool;
pub use traits::{ChannelSink, EventSink, JobEvent, ProcessHandle, ProcessLauncher};
