// Common data models for the download core

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::DownloadError;

/// Upper bound on attempts per job (the first attempt included).
pub const MAX_RETRIES: u32 = 3;

/// What to fetch from the URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownloadMode {
    #[default]
    VideoAndAudio,
    AudioOnly,
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideoAndAudio => write!(f, "Video + Audio"),
            Self::AudioOnly => write!(f, "Audio Only"),
        }
    }
}

/// Parsed form of a quality label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Best,
    /// Cap on the video height in pixels ("720p" -> 720)
    MaxHeight(u32),
}

impl Quality {
    /// Labels offered to the user, in display order
    pub const LABELS: [&'static str; 5] = ["Best", "1080p", "720p", "480p", "360p"];

    /// Parse "Best" (any case) or "<N>p" with N a positive integer.
    pub fn parse(label: &str) -> Result<Self, DownloadError> {
        let trimmed = label.trim();
        if trimmed.eq_ignore_ascii_case("best") {
            return Ok(Self::Best);
        }

        let digits = trimmed
            .strip_suffix('p')
            .or_else(|| trimmed.strip_suffix('P'))
            .unwrap_or(trimmed);

        // Plain decimal only: no sign, no leading zero
        let well_formed = !digits.is_empty()
            && !digits.starts_with('0')
            && digits.bytes().all(|b| b.is_ascii_digit());
        match digits.parse::<u32>() {
            Ok(height) if well_formed && height > 0 => Ok(Self::MaxHeight(height)),
            _ => Err(DownloadError::InvalidQuality(label.to_string())),
        }
    }
}

/// A user's download request. Moved into the job on submission.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub output_directory: PathBuf,
    pub mode: DownloadMode,
    /// Label as picked by the user, see [`Quality::LABELS`]
    pub quality: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_directory: output_directory.into(),
            mode: DownloadMode::default(),
            quality: "Best".to_string(),
        }
    }

    pub fn with_mode(mut self, mode: DownloadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    /// yt-dlp treats URLs carrying a `list=` parameter as playlists
    pub fn is_playlist(&self) -> bool {
        self.url.contains("list=")
    }
}

/// Cooperative cancellation signal shared between the caller and the worker.
///
/// Write-once: the flag only ever moves from false to true.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true only for the call that actually flipped the flag.
    pub fn request(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Succeeded,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Runtime instance wrapping one request
#[derive(Debug)]
pub struct DownloadJob {
    pub request: DownloadRequest,
    /// Attempts started so far, never above [`MAX_RETRIES`]
    pub attempt_count: u32,
    pub cancel: CancelFlag,
    pub state: JobState,
}

impl DownloadJob {
    pub fn new(request: DownloadRequest, cancel: CancelFlag) -> Self {
        Self {
            request,
            attempt_count: 0,
            cancel,
            state: JobState::Running,
        }
    }
}

/// Download progress in whole percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub percent: u8,
}

/// The single terminal notification of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Cancelled,
    Failed(DownloadError),
}

impl JobOutcome {
    pub fn state(&self) -> JobState {
        match self {
            Self::Succeeded => JobState::Succeeded,
            Self::Cancelled => JobState::Cancelled,
            Self::Failed(_) => JobState::Failed,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "Download completed!"),
            Self::Cancelled => write!(f, "Download cancelled."),
            Self::Failed(e) => write!(f, "Error: {}", e),
        }
    }
}
