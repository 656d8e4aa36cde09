use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, Command};
use tokio::sync::mpsc;

use crate::error::{IpcError, Result};

/// A spawned bridge with its stdin fed from a channel and its stdout
/// forwarded line by line.
pub struct ProcessHandle {
    child: Child,
    stdin_tx: mpsc::Sender<String>,
}

impl ProcessHandle {
    pub async fn spawn(
        working_dir: Option<&Path>,
        program: &str,
        args: &[String],
        line_tx: mpsc::Sender<String>,
    ) -> Result<Self> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| IpcError::SpawnFailed(format!("{}: {}", program, e)))?;

        let stdout = child.stdout.take().ok_or(IpcError::ProcessNotRunning)?;
        let stderr = child.stderr.take().ok_or(IpcError::ProcessNotRunning)?;
        let stdin = child.stdin.take().ok_or(IpcError::ProcessNotRunning)?;

        let (stdin_tx, stdin_rx) = mpsc::channel::<String>(100);

        tokio::spawn(write_lines(stdin, stdin_rx));
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line_tx.send(line).await.is_err() {
                    break;
                }
            }
        });
        tokio::spawn(relay_stderr(stderr));

        tracing::debug!(pid = child.id(), program, "Bridge spawned");
        Ok(Self { child, stdin_tx })
    }

    pub async fn send(&self, line: &str) -> Result<()> {
        let msg = if line.ends_with('\n') {
            line.to_string()
        } else {
            format!("{}\n", line)
        };

        self.stdin_tx
            .send(msg)
            .await
            .map_err(|_| IpcError::ChannelClosed)
    }

    pub async fn kill(&mut self) -> Result<()> {
        self.child.kill().await.map_err(IpcError::Io)
    }

    pub fn try_wait(&mut self) -> Result<Option<std::process::ExitStatus>> {
        self.child.try_wait().map_err(IpcError::Io)
    }
}

async fn write_lines(mut stdin: ChildStdin, mut rx: mpsc::Receiver<String>) {
    while let Some(line) = rx.recv().await {
        if stdin.write_all(line.as_bytes()).await.is_err() || stdin.flush().await.is_err() {
            tracing::debug!("Bridge stdin closed");
            break;
        }
    }
}

/// Bridge tracebacks land on stderr; keep them in the log.
async fn relay_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.trim().is_empty() {
            tracing::warn!("bridge stderr: {}", line);
        }
    }
}
