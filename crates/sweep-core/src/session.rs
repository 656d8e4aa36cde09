use std::path::PathBuf;

use async_trait::async_trait;

use crate::dialog::{DeleteHistory, Dialog, NotifySettings, RecentMessage, SelfUser};
use crate::error::RemoteResult;
use crate::proxy::Proxy;

/// Everything needed to open a client session for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub api_id: String,
    pub api_hash: String,
    pub phone_number: String,
    pub session_path: PathBuf,
    pub proxy: Option<Proxy>,
}

/// One authenticated connection to the messaging platform.
///
/// Any call may fail with [`RemoteError::RateLimited`](crate::RemoteError::RateLimited);
/// mutating calls may also fail with
/// [`RemoteError::PermissionDenied`](crate::RemoteError::PermissionDenied).
#[async_trait]
pub trait RemoteSession: Send + Sync {
    async fn connect(&self) -> RemoteResult<()>;

    async fn is_authorized(&self) -> RemoteResult<bool>;

    async fn request_login_code(&self, phone_number: &str) -> RemoteResult<()>;

    async fn sign_in(&self, phone_number: &str, code: &str) -> RemoteResult<()>;

    async fn sign_in_password(&self, password: &str) -> RemoteResult<()>;

    async fn get_self(&self) -> RemoteResult<SelfUser>;

    /// Snapshot of the account's dialogs at call time.
    async fn list_dialogs(&self) -> RemoteResult<Vec<Dialog>>;

    async fn get_recent_message(&self, dialog: &Dialog) -> RemoteResult<Option<RecentMessage>>;

    async fn update_notify_settings(
        &self,
        dialog: &Dialog,
        settings: &NotifySettings,
    ) -> RemoteResult<()>;

    async fn delete_history(&self, dialog: &Dialog, options: &DeleteHistory) -> RemoteResult<()>;

    async fn leave_channel(&self, dialog: &Dialog) -> RemoteResult<()>;

    async fn remove_self_from_group(&self, dialog: &Dialog) -> RemoteResult<()>;

    async fn disconnect(&self) -> RemoteResult<()>;
}

/// Creates sessions. Opening does not connect.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: RemoteSession;

    async fn open(&self, params: SessionParams) -> RemoteResult<Self::Session>;
}
