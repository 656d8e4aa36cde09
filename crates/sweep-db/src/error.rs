use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    #[error("Invalid proxy stored for account {account_id}: {source}")]
    InvalidProxy {
        account_id: i64,
        source: sweep_core::ProxyParseError,
    },
}

pub type Result<T> = std::result::Result<T, DbError>;
