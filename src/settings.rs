// Persisted user preferences: a flat key/value text file
//
// The file uses the Java properties layout (`key=value`, `#` comments,
// backslash escapes) and holds a single key, `downloadPath`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Default file name, relative to the working directory
pub const SETTINGS_FILE: &str = "config.properties";

const DOWNLOAD_PATH_KEY: &str = "downloadPath";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub download_path: Option<PathBuf>,
}

impl Settings {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No saved settings found.");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Ok(Self::parse(&content))
    }

    /// Write to `path`, replacing the file.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let stamp = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let mut content = format!("#User Preferences\n#{}\n", stamp);
        if let Some(dir) = &self.download_path {
            content.push_str(DOWNLOAD_PATH_KEY);
            content.push('=');
            content.push_str(&escape(&dir.to_string_lossy()));
            content.push('\n');
        }

        fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Saved download directory, else the platform download folder
    pub fn download_path_or_default(&self) -> Option<PathBuf> {
        self.download_path.clone().or_else(dirs::download_dir)
    }

    fn parse(content: &str) -> Self {
        let mut settings = Self::default();

        for raw in content.lines() {
            let line = raw.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let (key, value) = split_entry(line);
            if key == DOWNLOAD_PATH_KEY && !value.is_empty() {
                settings.download_path = Some(PathBuf::from(value));
            }
        }

        settings
    }
}

/// Split at the first unescaped `=` or `:` and unescape both halves
fn split_entry(line: &str) -> (String, String) {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '=' | ':' => {
                let key = unescape(line[..idx].trim_end());
                let value = unescape(line[idx + 1..].trim_start());
                return (key, value);
            }
            _ => {}
        }
    }
    (unescape(line.trim_end()), String::new())
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (idx, c) in value.chars().enumerate() {
        match c {
            '\\' | ':' | '=' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            ' ' if idx == 0 => out.push_str("\\ "),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}
