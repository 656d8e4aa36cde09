use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge process not running")]
    ProcessNotRunning,

    #[error("Failed to spawn bridge: {0}")]
    SpawnFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Timeout waiting for {0}")]
    Timeout(&'static str),
}

pub type Result<T> = std::result::Result<T, IpcError>;
