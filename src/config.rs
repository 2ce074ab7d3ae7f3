// Runtime configuration for the download core

use std::time::Duration;

use crate::ytdlp::YTDLP_PROGRAM;

/// Environment variable overriding the executable, e.g. a venv or a pinned build
pub const PROGRAM_ENV: &str = "YTDLP_BIN";

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Executable to run; looked up on the search path unless absolute
    pub program: String,
    /// Upper bound on the `--version` preflight
    pub version_timeout: Duration,
    /// Pause between a failed attempt and the next one
    pub retry_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            program: YTDLP_PROGRAM.to_string(),
            version_timeout: Duration::from_secs(30),
            retry_delay: Duration::ZERO,
        }
    }
}

impl FetchConfig {
    /// Defaults, with the program taken from `YTDLP_BIN` when set
    pub fn from_env() -> Self {
        Self::default().with_program(program_from(std::env::var(PROGRAM_ENV).ok()))
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_version_timeout(mut self, timeout: Duration) -> Self {
        self.version_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

fn program_from(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| YTDLP_PROGRAM.to_string())
}
