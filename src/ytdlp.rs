// yt-dlp wire protocol: argument construction and output scraping
//
// Everything in here is pure. Progress scraping depends on yt-dlp's human
// readable output; if that format changes, progress simply stops updating.

use regex::Regex;
use std::path::Path;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadMode, DownloadRequest, Quality};

/// Executable looked up on the search path
pub const YTDLP_PROGRAM: &str = "yt-dlp";

/// Argument for the preflight check
pub const VERSION_ARG: &str = "--version";

/// Target codec for audio-only downloads
pub const AUDIO_FORMAT: &str = "mp3";

/// Filename template appended to the output directory
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Build the ordered argument list for one download attempt.
///
/// The result is handed to the process as a vector, never through a shell,
/// so URL and path content cannot inject commands.
pub fn build_download_args(request: &DownloadRequest) -> Result<Vec<String>, DownloadError> {
    let mut args = Vec::new();

    match request.mode {
        // Audio mode has no quality choice; the label is ignored
        DownloadMode::AudioOnly => {
            args.extend([
                "-x".to_string(),
                "--audio-format".to_string(),
                AUDIO_FORMAT.to_string(),
            ]);
        }
        DownloadMode::VideoAndAudio => {
            args.push("-f".to_string());
            args.push(format_selector(Quality::parse(&request.quality)?));
        }
    }

    args.push("-o".to_string());
    args.push(output_template(&request.output_directory));
    args.push(request.url.clone());

    Ok(args)
}

/// yt-dlp `-f` value for a parsed quality
pub fn format_selector(quality: Quality) -> String {
    match quality {
        Quality::Best => "best".to_string(),
        Quality::MaxHeight(height) => format!("bestvideo[height<={}]+bestaudio/best", height),
    }
}

/// `<dir>/%(title)s.%(ext)s` with the platform separator
pub fn output_template(dir: &Path) -> String {
    dir.join(OUTPUT_TEMPLATE).to_string_lossy().to_string()
}

/// Extract a whole percentage from one line of tool output.
///
/// The percent token is the whitespace-delimited field right before the
/// first `%`. Lines without a usable token are ordinary output, so this
/// returns `None` instead of failing.
/// Example: `[download]  42.0% of 10MiB` -> `Some(42)`
pub fn parse_progress(line: &str) -> Option<u8> {
    let percent_at = line.find('%')?;
    let token = line[..percent_at].split_whitespace().next_back()?;
    let value: f64 = token.parse().ok()?;

    if !(0.0..=100.0).contains(&value) {
        return None;
    }

    Some(value.trunc() as u8)
}

/// Message of an `ERROR:` line printed by yt-dlp, if this is one
pub fn error_message(line: &str) -> Option<&str> {
    lazy_static::lazy_static! {
        static ref ERROR_RE: Regex = Regex::new(r"^\s*ERROR:\s*(.+?)\s*$").unwrap();
    }

    ERROR_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
