//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use yt_fetch::downloader::{DownloadMode, Quality};
use yt_fetch::settings::SETTINGS_FILE;

/// Download a video or its audio track with yt-dlp.
///
/// Progress is shown as a bar; Ctrl-C cancels the running download.
#[derive(Parser, Debug)]
#[command(name = "yt-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// URL of the video or playlist
    pub url: String,

    /// Download directory; remembered for next time
    #[arg(short = 'd', long = "dir")]
    pub dir: Option<PathBuf>,

    /// Extract the audio track as mp3 instead of downloading video
    #[arg(short = 'a', long)]
    pub audio_only: bool,

    /// Maximum video quality
    #[arg(short = 'q', long, default_value = "Best", value_parser = Quality::LABELS)]
    pub quality: String,

    /// Settings file holding the remembered download directory
    #[arg(long, default_value = SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Seconds to wait between failed attempts
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u64).range(0..=300))]
    pub retry_delay: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn mode(&self) -> DownloadMode {
        if self.audio_only {
            DownloadMode::AudioOnly
        } else {
            DownloadMode::VideoAndAudio
        }
    }
}
