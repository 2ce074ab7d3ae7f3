// Scripted stand-ins for the process layer and the UI, used by unit tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::errors::DownloadError;
use super::models::{CancelFlag, JobOutcome, ProgressEvent};
use super::traits::{EventSink, JobEvent, ProcessHandle, ProcessLauncher};

/// What the next launched process does
#[derive(Debug, Clone)]
pub enum Script {
    /// `launch` itself fails
    StartFails,
    /// Prints `lines`, then exits with `exit_code`
    Run { lines: Vec<String>, exit_code: i32 },
    /// Prints `lines`, then the stream breaks
    ReadError { lines: Vec<String> },
    /// Prints `lines`, then never writes or exits again
    Hangs { lines: Vec<String> },
}

impl Script {
    pub fn version(version: &str) -> Self {
        Self::exits(&[version], 0)
    }

    pub fn exits(lines: &[&str], exit_code: i32) -> Self {
        Self::Run {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            exit_code,
        }
    }
}

#[derive(Default)]
struct Counters {
    live: AtomicUsize,
    max_live: AtomicUsize,
    terminations: AtomicUsize,
}

/// Launcher that replays scripts in order and records every invocation
#[derive(Default)]
pub struct FakeLauncher {
    scripts: Mutex<VecDeque<Script>>,
    launches: Mutex<Vec<Vec<String>>>,
    counters: Arc<Counters>,
}

impl FakeLauncher {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Arguments of every launch, preflight included
    pub fn launches(&self) -> Vec<Vec<String>> {
        self.launches.lock().unwrap().clone()
    }

    /// Launches other than `--version`
    pub fn download_launches(&self) -> usize {
        self.launches()
            .iter()
            .filter(|args| args.as_slice() != ["--version"])
            .count()
    }

    pub fn max_live(&self) -> usize {
        self.counters.max_live.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    pub fn terminations(&self) -> usize {
        self.counters.terminations.load(Ordering::SeqCst)
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn ProcessHandle>, DownloadError> {
        self.launches.lock().unwrap().push(args.to_vec());

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::StartFails);

        let hangs = matches!(script, Script::Hangs { .. });
        let (lines, exit_code) = match script {
            Script::StartFails => {
                return Err(DownloadError::ProcessStart {
                    program: program.to_string(),
                    reason: "No such file or directory".to_string(),
                })
            }
            Script::Run { lines, exit_code } => {
                (lines.into_iter().map(Ok).collect::<VecDeque<_>>(), exit_code)
            }
            Script::ReadError { lines } => {
                let mut lines: VecDeque<_> = lines.into_iter().map(Ok).collect();
                lines.push_back(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")));
                (lines, 1)
            }
            Script::Hangs { lines } => (lines.into_iter().map(Ok).collect::<VecDeque<_>>(), -1),
        };

        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(FakeProcess {
            lines,
            exit_code,
            hangs,
            terminated: false,
            counters: self.counters.clone(),
        }))
    }
}

struct FakeProcess {
    lines: VecDeque<io::Result<String>>,
    exit_code: i32,
    hangs: bool,
    terminated: bool,
    counters: Arc<Counters>,
}

#[async_trait]
impl ProcessHandle for FakeProcess {
    async fn next_line(&mut self) -> Option<io::Result<String>> {
        if self.terminated {
            return None;
        }
        match self.lines.pop_front() {
            None if self.hangs => std::future::pending().await,
            line => line,
        }
    }

    fn terminate(&mut self) {
        // Exited processes have nothing left to kill
        if self.terminated || (self.lines.is_empty() && !self.hangs) {
            return;
        }
        self.terminated = true;
        self.exit_code = -1;
        self.counters.terminations.fetch_add(1, Ordering::SeqCst);
    }

    async fn wait(&mut self) -> io::Result<i32> {
        Ok(self.exit_code)
    }
}

impl Drop for FakeProcess {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Sink that records events, optionally requesting cancellation when a log
/// line containing a marker goes by
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<JobEvent>>,
    cancel_on: Option<(String, CancelFlag)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_on(marker: &str, flag: CancelFlag) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            cancel_on: Some((marker.to_string(), flag)),
        }
    }

    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn logs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                JobEvent::Log(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                JobEvent::Progress(p) => Some(p.percent),
                _ => None,
            })
            .collect()
    }

    pub fn terminals(&self) -> Vec<JobOutcome> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                JobEvent::Terminal(outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn on_log(&self, line: &str) {
        self.events.lock().unwrap().push(JobEvent::Log(line.to_string()));
        if let Some((marker, flag)) = &self.cancel_on {
            if line.contains(marker.as_str()) {
                flag.request();
            }
        }
    }

    fn on_progress(&self, progress: ProgressEvent) {
        self.events.lock().unwrap().push(JobEvent::Progress(progress));
    }

    fn on_terminal(&self, outcome: &JobOutcome) {
        self.events
            .lock()
            .unwrap()
            .push(JobEvent::Terminal(outcome.clone()));
    }
}
