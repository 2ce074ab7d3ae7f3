// Error types for the download core

use thiserror::Error;

/// Failures a download job can end with.
///
/// `Cancelled` is deliberately absent: a user cancellation is an outcome,
/// see [`JobOutcome`](super::models::JobOutcome).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// yt-dlp could not be invoked, or `--version` misbehaved
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Quality label that is neither "Best" nor "<N>p"
    #[error("Invalid quality: {0:?}")]
    InvalidQuality(String),

    /// The OS refused to launch the process
    #[error("Failed to start {program}: {reason}")]
    ProcessStart { program: String, reason: String },

    /// The tool ran and reported failure
    #[error("{}", non_zero_exit_message(.code, .detail))]
    NonZeroExit { code: i32, detail: Option<String> },

    /// I/O failure while reading the merged output stream
    #[error("Failed to read tool output: {0}")]
    StreamRead(String),
}

fn non_zero_exit_message(code: &i32, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("Download failed with exit code {}: {}", code, detail),
        None => format!("Download failed with exit code {}", code),
    }
}

impl DownloadError {
    /// Attempt-level failures are retried; everything else ends the job.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProcessStart { .. } | Self::NonZeroExit { .. } | Self::StreamRead(_)
        )
    }

    /// Short machine-readable classification for UI collaborators.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolNotFound(_) => "tool_not_found",
            Self::InvalidQuality(_) => "invalid_quality",
            Self::ProcessStart { .. } => "process_start",
            Self::NonZeroExit { .. } => "non_zero_exit",
            Self::StreamRead(_) => "stream_read",
        }
    }
}

/// Reasons a job is refused before a worker is started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("A download is already in progress")]
    Busy,

    #[error("Please enter a URL")]
    EmptyUrl,

    #[error("Please select a download location")]
    MissingOutputDirectory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(DownloadError::NonZeroExit { code: 1, detail: None }.is_retryable());
        assert!(DownloadError::StreamRead("broken pipe".to_string()).is_retryable());
        assert!(DownloadError::ProcessStart {
            program: "yt-dlp".to_string(),
            reason: "permission denied".to_string(),
        }
        .is_retryable());

        assert!(!DownloadError::ToolNotFound("yt-dlp".to_string()).is_retryable());
        assert!(!DownloadError::InvalidQuality("bogus".to_string()).is_retryable());
    }

    #[test]
    fn test_non_zero_exit_message_includes_detail() {
        let plain = DownloadError::NonZeroExit { code: 2, detail: None };
        assert_eq!(plain.to_string(), "Download failed with exit code 2");

        let detailed = DownloadError::NonZeroExit {
            code: 1,
            detail: Some("Unsupported URL: https://x".to_string()),
        };
        assert_eq!(
            detailed.to_string(),
            "Download failed with exit code 1: Unsupported URL: https://x"
        );
    }
}
