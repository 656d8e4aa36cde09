use std::time::Duration;

use thiserror::Error;

/// Failures reported by a remote session call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Rate limited, retry after {}s", wait.as_secs())]
    RateLimited { wait: Duration },

    #[error("Administrative rights required: {0}")]
    PermissionDenied(String),

    #[error("Two-step verification password required")]
    PasswordRequired,

    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Remote error: {0}")]
    Other(String),
}

impl RemoteError {
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RemoteError::RateLimited { wait } => Some(*wait),
            _ => None,
        }
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
