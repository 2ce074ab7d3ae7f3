// OS process runner: spawns the tool and streams its merged output
//
// stdout and stderr are drained by one reader task each, both feeding the
// same channel, so neither pipe can fill up and stall the child.

use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command as TokioCommand};
use tokio::sync::mpsc;
use tracing::debug;

use super::errors::DownloadError;
use super::traits::{ProcessHandle, ProcessLauncher};

/// Launches real processes through `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for SystemLauncher {
    fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn ProcessHandle>, DownloadError> {
        let mut cmd = TokioCommand::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        configure_for_background(&mut cmd);

        let mut child = cmd.spawn().map_err(|e| DownloadError::ProcessStart {
            program: program.to_string(),
            reason: e.to_string(),
        })?;
        debug!(program, pid = ?child.id(), "process started");

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        Ok(Box::new(SystemProcess {
            program: program.to_string(),
            child,
            lines: rx,
            exit_code: None,
            terminated: false,
        }))
    }
}

#[cfg(windows)]
fn configure_for_background(cmd: &mut TokioCommand) {
    // Keep a console window from popping up for every attempt
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn configure_for_background(_cmd: &mut TokioCommand) {}

/// One spawned process and the receiving end of its merged output
pub struct SystemProcess {
    program: String,
    child: Child,
    lines: mpsc::UnboundedReceiver<io::Result<String>>,
    exit_code: Option<i32>,
    terminated: bool,
}

#[async_trait]
impl ProcessHandle for SystemProcess {
    async fn next_line(&mut self) -> Option<io::Result<String>> {
        self.lines.recv().await
    }

    fn terminate(&mut self) {
        if self.terminated || self.exit_code.is_some() {
            return;
        }
        self.terminated = true;

        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(program = %self.program, "process already exited, nothing to kill");
                self.exit_code = Some(exit_code(status));
            }
            _ => {
                if let Err(e) = self.child.start_kill() {
                    debug!(program = %self.program, error = %e, "kill failed");
                }
            }
        }
    }

    async fn wait(&mut self) -> io::Result<i32> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }

        let status = self.child.wait().await?;
        let code = exit_code(status);
        debug!(program = %self.program, code, "process exited");
        self.exit_code = Some(code);
        Ok(code)
    }
}

/// Killed-by-signal has no exit code; report it as -1
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

async fn forward_lines<R>(mut pipe: R, tx: mpsc::UnboundedSender<io::Result<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 4096];
    let mut lines = LineBuffer::default();

    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                for line in lines.push(&chunk[..n]) {
                    if tx.send(Ok(line)).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }

    if let Some(line) = lines.finish() {
        let _ = tx.send(Ok(line));
    }
}

/// Cuts raw output at every `\r` or `\n` as the bytes arrive.
///
/// yt-dlp redraws progress with a bare `\r` and writes `\n` only once a file
/// is done. An incomplete tail is kept until the next chunk.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == b'\r' || byte == b'\n' {
                lines.extend(self.take());
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Whatever is left once the pipe closes
    fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        if line.trim().is_empty() {
            None
        } else {
            Some(line)
        }
    }
}
