use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use sweep_core::{BridgeCommand, BridgeEvent, BridgeFailure, BridgeMessage};

use crate::error::{IpcError, Result};
use crate::process::ProcessHandle;

/// Outcome of one bridge command: its `data` on success.
pub type CommandReply = std::result::Result<Option<serde_json::Value>, BridgeFailure>;

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<CommandReply>>>>;
type PendingGuard<'a> = MutexGuard<'a, HashMap<String, oneshot::Sender<CommandReply>>>;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub request_timeout: Duration,
}

/// Owns the bridge child process and matches its replies to requests.
pub struct BridgeManager {
    config: BridgeConfig,
    process: tokio::sync::Mutex<Option<ProcessHandle>>,
    pending: PendingMap,
}

impl BridgeManager {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            process: tokio::sync::Mutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut process = self.process.lock().await;
        if process.is_some() {
            return Ok(());
        }

        if let Some(dir) = &self.config.working_dir {
            if !dir.is_dir() {
                return Err(IpcError::SpawnFailed(format!(
                    "bridge directory {} does not exist",
                    dir.display()
                )));
            }
        }

        info!(program = %self.config.program, "Starting bridge process");

        let (line_tx, mut line_rx) = mpsc::channel::<String>(1000);
        let handle = ProcessHandle::spawn(
            self.config.working_dir.as_deref(),
            &self.config.program,
            &self.config.args,
            line_tx,
        )
        .await?;

        let pending = self.pending.clone();
        tokio::spawn(async move {
            while let Some(line) = line_rx.recv().await {
                route_line(&pending, &line);
            }
            // Stdout closed: fail whoever is still waiting.
            lock(&pending).clear();
            info!("Bridge output closed");
        });

        *process = Some(handle);
        info!("Bridge process started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut guard = self.process.lock().await;
        if let Some(process) = guard.as_ref() {
            info!("Stopping bridge process");
            let line = BridgeMessage::new_command(BridgeCommand::Shutdown).to_line()?;
            let _ = process.send(&line).await;
        }
        if let Some(mut process) = guard.take() {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let _ = process.kill().await;
            info!("Bridge process stopped");
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        let mut guard = self.process.lock().await;
        let status = guard.as_mut().map(ProcessHandle::try_wait);
        match status {
            Some(Ok(None)) => true,
            Some(_) => {
                *guard = None;
                false
            }
            None => false,
        }
    }

    /// Sends a command and waits for its `CommandResult`.
    pub async fn request(&self, command: BridgeCommand) -> Result<CommandReply> {
        let name = command.name();
        let message = BridgeMessage::new_command(command);
        let id = message.id.clone();
        let line = message.to_line()?;

        let (reply_tx, reply_rx) = oneshot::channel();
        lock(&self.pending).insert(id.clone(), reply_tx);

        debug!(command = name, id = %id, "Sending bridge command");

        let sent = {
            let process = self.process.lock().await;
            match process.as_ref() {
                Some(process) => process.send(&line).await,
                None => Err(IpcError::ProcessNotRunning),
            }
        };
        if let Err(e) = sent {
            lock(&self.pending).remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.config.request_timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(IpcError::ChannelClosed),
            Err(_) => {
                lock(&self.pending).remove(&id);
                Err(IpcError::Timeout(name))
            }
        }
    }
}

fn lock(pending: &PendingMap) -> PendingGuard<'_> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn route_line(pending: &PendingMap, line: &str) {
    let Some(event) = BridgeMessage::from_line(line).and_then(BridgeMessage::into_event) else {
        debug!("Ignoring unparseable bridge line: {}", line);
        return;
    };

    match event {
        BridgeEvent::Ready => info!("Bridge is ready"),
        BridgeEvent::Log { level, message } => match level.as_str() {
            "error" => tracing::error!(target: "sweep_ipc::bridge", "{}", message),
            "warning" | "warn" => tracing::warn!(target: "sweep_ipc::bridge", "{}", message),
            "debug" => tracing::debug!(target: "sweep_ipc::bridge", "{}", message),
            _ => tracing::info!(target: "sweep_ipc::bridge", "{}", message),
        },
        BridgeEvent::CommandResult {
            command_id,
            success,
            data,
            error,
        } => {
            let reply = match (success, error) {
                (_, Some(failure)) => Err(failure),
                (true, None) => Ok(data),
                (false, None) => Err(BridgeFailure::Other {
                    message: "command failed without an error".to_string(),
                }),
            };

            match lock(pending).remove(&command_id) {
                Some(tx) => {
                    let _ = tx.send(reply);
                }
                None => debug!(command_id = %command_id, "Reply for unknown command"),
            }
        }
    }
}
