// yt-fetch: drives yt-dlp downloads with progress reporting, cooperative
// cancellation and bounded retry. UIs plug in through `EventSink`.

pub mod config;
pub mod downloader;
pub mod settings;
pub mod ytdlp;

pub use config::FetchConfig;
pub use downloader::{
    ChannelSink, DownloadError, DownloadManager, DownloadMode, DownloadRequest, EventSink,
    JobEvent, JobHandle, JobOutcome, Orchestrator, ProgressEvent, SubmitError,
};
pub use settings::Settings;
