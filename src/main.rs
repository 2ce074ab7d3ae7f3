//! CLI entry point: one download per invocation.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use yt_fetch::downloader::{ChannelSink, DownloadManager, DownloadRequest, JobEvent, JobOutcome};
use yt_fetch::{FetchConfig, Orchestrator, Settings};

mod cli;

use cli::Args;

/// Conventional exit status for a run interrupted by Ctrl-C
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // RUST_LOG wins over -v
    let default_level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let mut settings = Settings::load(&args.settings)
        .with_context(|| format!("Error loading settings from {}", args.settings.display()))?;

    let output_directory = match &args.dir {
        Some(dir) => {
            settings.download_path = Some(dir.clone());
            if let Err(e) = settings.save(&args.settings) {
                warn!(error = %e, "Error saving settings");
            }
            dir.clone()
        }
        None => settings
            .download_path_or_default()
            .context("Please select a download location with --dir")?,
    };

    let config = FetchConfig::from_env().with_retry_delay(Duration::from_secs(args.retry_delay));
    let manager = DownloadManager::new(Orchestrator::with_system_launcher(config));

    let request = DownloadRequest::new(args.url.clone(), output_directory)
        .with_mode(args.mode())
        .with_quality(args.quality.clone());

    let (sink, mut events) = ChannelSink::channel();
    let handle = manager.submit(request, Arc::new(sink))?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")?.progress_chars("=> "),
    );

    let cancel = handle.cancel_flag();
    let cancel_bar = bar.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && cancel.request() {
            cancel_bar.suspend(|| println!("Download cancellation requested."));
        }
    });

    let mut outcome = None;
    while let Some(event) = events.recv().await {
        match event {
            // ProgressBar::println is a no-op while the bar is hidden; suspend still prints
            JobEvent::Log(line) => bar.suspend(|| println!("{}", line)),
            JobEvent::Progress(progress) => bar.set_position(u64::from(progress.percent)),
            JobEvent::Terminal(terminal) => {
                outcome = Some(terminal);
                break;
            }
        }
    }
    bar.finish_and_clear();

    // The worker has already delivered its outcome; this only surfaces panics
    let joined = handle.wait().await.context("download worker crashed")?;
    let outcome = outcome.unwrap_or(joined);

    Ok(match outcome {
        JobOutcome::Succeeded => ExitCode::SUCCESS,
        JobOutcome::Cancelled => ExitCode::from(EXIT_CANCELLED),
        // the failure was already printed as the job's last log line
        JobOutcome::Failed(_) => ExitCode::FAILURE,
    })
}
