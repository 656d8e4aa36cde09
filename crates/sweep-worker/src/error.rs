use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Database error: {0}")]
    Db(#[from] sweep_db::DbError),

    #[error("Bridge error: {0}")]
    Ipc(#[from] sweep_ipc::IpcError),

    #[error("{0}")]
    Remote(#[from] sweep_core::RemoteError),

    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    #[error("Input error: {0}")]
    Prompt(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WorkerError {
    /// Storage failures have no recovery path; everything else only
    /// aborts the current operation.
    pub fn is_fatal(&self) -> bool {
        match self {
            WorkerError::Db(
                sweep_db::DbError::AccountNotFound(_) | sweep_db::DbError::InvalidProxy { .. },
            ) => false,
            WorkerError::Db(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
