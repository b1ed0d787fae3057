//! Probe runner and value extractor
//!
//! Both run a shell command under a bounded wait. The timeout is checked
//! before the exit status: a command that is still running at the deadline
//! is killed and reported as timed out, whatever it would have returned.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::common::Result;

use super::config::KeyType;

/// Outcome of running a probe command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Exited 0; carries the captured stdout
    Ok(Vec<u8>),
    /// Exited non-zero, or was killed by a signal (`None`)
    Failed(Option<i32>),
    TimedOut,
}

/// Outcome of extracting a key's value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    Value(String),
    Failed(Option<i32>),
    TimedOut,
}

/// Spawns shell commands with a shared timeout
#[derive(Debug, Clone)]
pub struct ShellRunner {
    timeout: Duration,
    /// Let command stderr through to the terminal
    show_stderr: bool,
}

impl ShellRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            show_stderr: false,
        }
    }

    pub fn show_stderr(mut self, show: bool) -> Self {
        self.show_stderr = show;
        self
    }

    fn shell(&self, command: &str, stdin: Stdio) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(if self.show_stderr {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        cmd
    }

    /// Run a probe command and capture its stdout
    pub async fn run_probe(&self, command: &str) -> Result<ProbeOutcome> {
        tracing::debug!(command, "Running probe");

        let mut child = self.shell(command, Stdio::null()).spawn()?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("probe stdout was not captured"))?;

        let run = async {
            let mut out = Vec::new();
            stdout.read_to_end(&mut out).await?;
            let status = child.wait().await?;
            Ok::<_, io::Error>((status, out))
        };

        let result = timeout(self.timeout, run).await;
        match result {
            Err(_) => {
                kill_and_reap(&mut child).await;
                Ok(ProbeOutcome::TimedOut)
            }
            Ok(result) => {
                let (status, out) = result?;
                if status.success() {
                    Ok(ProbeOutcome::Ok(out))
                } else {
                    Ok(ProbeOutcome::Failed(status.code()))
                }
            }
        }
    }

    /// Run an extraction command with `input` on its stdin.
    ///
    /// String keys take the trimmed stdout and fail on a non-zero exit.
    /// Boolean keys take the exit status itself, so any normal exit yields
    /// a value.
    pub async fn extract(
        &self,
        command: &str,
        key_type: KeyType,
        input: &[u8],
    ) -> Result<ExtractOutcome> {
        tracing::debug!(command, ?key_type, "Extracting value");

        let mut child = self.shell(command, Stdio::piped()).spawn()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("extractor stdin was not captured"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("extractor stdout was not captured"))?;

        let run = async {
            let feed = async {
                // The extractor may exit without reading everything.
                if let Err(e) = stdin.write_all(input).await {
                    if e.kind() != io::ErrorKind::BrokenPipe {
                        return Err(e);
                    }
                }
                drop(stdin);
                Ok(())
            };
            let mut out = Vec::new();
            let (fed, read) = tokio::join!(feed, stdout.read_to_end(&mut out));
            fed?;
            read?;
            let status = child.wait().await?;
            Ok::<_, io::Error>((status, out))
        };

        let result = timeout(self.timeout, run).await;
        match result {
            Err(_) => {
                kill_and_reap(&mut child).await;
                Ok(ExtractOutcome::TimedOut)
            }
            Ok(result) => {
                let (status, out) = result?;
                Ok(classify_extraction(status, &out, key_type))
            }
        }
    }
}

fn classify_extraction(status: ExitStatus, out: &[u8], key_type: KeyType) -> ExtractOutcome {
    match (key_type, status.code()) {
        (KeyType::Boolean, Some(code)) => ExtractOutcome::Value(code.to_string()),
        (KeyType::Boolean, None) => ExtractOutcome::Failed(None),
        (KeyType::String, _) if status.success() => {
            ExtractOutcome::Value(String::from_utf8_lossy(out).trim().to_string())
        }
        (KeyType::String, code) => ExtractOutcome::Failed(code),
    }
}

/// Kill a timed-out child and wait for it; its pending output is dropped unread
async fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill timed-out command: {}", e);
    }
}
