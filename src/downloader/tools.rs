// Preflight: make sure the external tool can be invoked before a job starts

use std::time::Duration;
use tracing::debug;

use super::errors::DownloadError;
use super::traits::ProcessLauncher;
use crate::ytdlp::VERSION_ARG;

/// Run `<program> --version` and return the version it prints.
///
/// Fails with `ToolNotFound` when the process cannot start, prints nothing,
/// exits non-zero or does not finish within `timeout`.
pub async fn check_tool(
    launcher: &dyn ProcessLauncher,
    program: &str,
    timeout: Duration,
) -> Result<String, DownloadError> {
    match tokio::time::timeout(timeout, query_version(launcher, program)).await {
        Ok(result) => result,
        // Dropping the future drops the handle, which kills the child
        Err(_) => Err(DownloadError::ToolNotFound(format!(
            "{} {} timed out after {}s",
            program,
            VERSION_ARG,
            timeout.as_secs()
        ))),
    }
}

async fn query_version(
    launcher: &dyn ProcessLauncher,
    program: &str,
) -> Result<String, DownloadError> {
    let mut process = launcher
        .launch(program, &[VERSION_ARG.to_string()])
        .map_err(|e| {
            DownloadError::ToolNotFound(format!(
                "{} is not installed or not found in the system path ({})",
                program, e
            ))
        })?;

    let mut version: Option<String> = None;
    while let Some(line) = process.next_line().await {
        match line {
            Ok(line) => {
                let trimmed = line.trim();
                if version.is_none() && !trimmed.is_empty() {
                    version = Some(trimmed.to_string());
                }
            }
            Err(e) => {
                process.terminate();
                let _ = process.wait().await;
                return Err(DownloadError::ToolNotFound(format!(
                    "could not read {} {} output: {}",
                    program, VERSION_ARG, e
                )));
            }
        }
    }

    let code = process.wait().await.map_err(|e| {
        DownloadError::ToolNotFound(format!("{} {} did not exit cleanly: {}", program, VERSION_ARG, e))
    })?;
    if code != 0 {
        return Err(DownloadError::ToolNotFound(format!(
            "{} not found (exit code {}). Please install it first.",
            program, code
        )));
    }

    let version = version.ok_or_else(|| {
        DownloadError::ToolNotFound(format!(
            "{} is not installed or not found in the system path",
            program
        ))
    })?;
    debug!(program, %version, "tool available");
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::testing::{FakeLauncher, Script};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_version_is_first_line() {
        let launcher = FakeLauncher::new([Script::exits(&["2024.08.06", "extra"], 0)]);

        let version = check_tool(&launcher, "yt-dlp", TIMEOUT).await.unwrap();

        assert_eq!(version, "2024.08.06");
        assert_eq!(launcher.launches(), vec![vec!["--version".to_string()]]);
        assert_eq!(launcher.live(), 0);
    }

    #[tokio::test]
    async fn test_start_failure_is_tool_not_found() {
        let launcher = FakeLauncher::new([Script::StartFails]);

        let err = check_tool(&launcher, "yt-dlp", TIMEOUT).await.unwrap_err();
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_silent_tool_is_tool_not_found() {
        let launcher = FakeLauncher::new([Script::exits(&[], 0)]);

        let err = check_tool(&launcher, "yt-dlp", TIMEOUT).await.unwrap_err();
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_tool_not_found() {
        let launcher = FakeLauncher::new([Script::exits(&["yt-dlp: command not found"], 127)]);

        let err = check_tool(&launcher, "yt-dlp", TIMEOUT).await.unwrap_err();
        assert!(matches!(err, DownloadError::ToolNotFound(msg) if msg.contains("127")));
    }

    #[tokio::test]
    async fn test_read_error_is_tool_not_found() {
        let launcher = FakeLauncher::new([Script::ReadError { lines: vec![] }]);

        let err = check_tool(&launcher, "yt-dlp", TIMEOUT).await.unwrap_err();
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
        assert_eq!(launcher.live(), 0);
    }

    #[tokio::test]
    async fn test_hung_tool_times_out_as_tool_not_found() {
        let launcher = FakeLauncher::new([Script::Hangs {
            lines: vec!["2024.08.06".to_string()],
        }]);

        let err = check_tool(&launcher, "yt-dlp", Duration::from_millis(50))
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::ToolNotFound(msg) if msg.contains("timed out")));
        // the abandoned handle is dropped, which kills a real child
        assert_eq!(launcher.live(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_real_process_version_query() {
        use crate::downloader::process::SystemLauncher;

        // Whichever echo is installed, `echo --version` prints a line and exits 0
        let version = check_tool(&SystemLauncher::new(), "echo", TIMEOUT)
            .await
            .unwrap();
        assert!(!version.is_empty());

        let err = check_tool(&SystemLauncher::new(), "yt-fetch-test-no-such-binary", TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }
}
