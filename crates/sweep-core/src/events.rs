use std::time::Duration;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::dialog::{DeleteHistory, Dialog, DialogKind, NotifySettings, RecentMessage};
use crate::error::RemoteError;
use crate::proxy::Proxy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BridgeCommand {
    Connect {
        session_path: String,
        api_id: String,
        api_hash: String,
        proxy: Option<Proxy>,
    },
    IsAuthorized,
    RequestLoginCode { phone_number: String },
    SignIn { phone_number: String, code: String },
    SignInPassword { password: String },
    GetSelf,
    ListDialogs,
    GetRecentMessage { peer: PeerRef },
    UpdateNotifySettings { peer: PeerRef, settings: NotifySettingsData },
    DeleteHistory { peer: PeerRef, max_id: i64, just_clear: bool, revoke: bool },
    LeaveChannel { peer: PeerRef },
    RemoveSelfFromGroup { peer: PeerRef },
    Disconnect,
    Shutdown,
}

impl BridgeCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeCommand::Connect { .. } => "Connect",
            BridgeCommand::IsAuthorized => "IsAuthorized",
            BridgeCommand::RequestLoginCode { .. } => "RequestLoginCode",
            BridgeCommand::SignIn { .. } => "SignIn",
            BridgeCommand::SignInPassword { .. } => "SignInPassword",
            BridgeCommand::GetSelf => "GetSelf",
            BridgeCommand::ListDialogs => "ListDialogs",
            BridgeCommand::GetRecentMessage { .. } => "GetRecentMessage",
            BridgeCommand::UpdateNotifySettings { .. } => "UpdateNotifySettings",
            BridgeCommand::DeleteHistory { .. } => "DeleteHistory",
            BridgeCommand::LeaveChannel { .. } => "LeaveChannel",
            BridgeCommand::RemoveSelfFromGroup { .. } => "RemoveSelfFromGroup",
            BridgeCommand::Disconnect => "Disconnect",
            BridgeCommand::Shutdown => "Shutdown",
        }
    }

    pub fn delete_history(dialog: &Dialog, options: &DeleteHistory) -> Self {
        BridgeCommand::DeleteHistory {
            peer: dialog.into(),
            max_id: options.max_id,
            just_clear: options.just_clear,
            revoke: options.revoke,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BridgeEvent {
    Ready,
    Log {
        level: String,
        message: String,
    },
    CommandResult {
        command_id: String,
        success: bool,
        data: Option<serde_json::Value>,
        error: Option<BridgeFailure>,
    },
}

/// Error classes the bridge distinguishes. Everything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BridgeFailure {
    FloodWait { seconds: u64 },
    ChatAdminRequired,
    SessionPasswordNeeded,
    Other { message: String },
}

impl From<BridgeFailure> for RemoteError {
    fn from(failure: BridgeFailure) -> Self {
        match failure {
            BridgeFailure::FloodWait { seconds } => RemoteError::RateLimited {
                wait: Duration::from_secs(seconds),
            },
            BridgeFailure::ChatAdminRequired => {
                RemoteError::PermissionDenied("chat admin required".to_string())
            }
            BridgeFailure::SessionPasswordNeeded => RemoteError::PasswordRequired,
            BridgeFailure::Other { message } => RemoteError::Other(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRef {
    pub id: i64,
    pub kind: DialogKind,
}

impl From<&Dialog> for PeerRef {
    fn from(dialog: &Dialog) -> Self {
        Self {
            id: dialog.id,
            kind: dialog.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifySettingsData {
    pub show_previews: bool,
    pub silent: bool,
    pub mute_until: i64,
}

impl From<&NotifySettings> for NotifySettingsData {
    fn from(settings: &NotifySettings) -> Self {
        Self {
            show_previews: settings.show_previews,
            silent: settings.silent,
            mute_until: settings.mute_until.to_wire(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageData {
    pub id: i64,
    /// Unix seconds.
    pub date: i64,
}

impl TryFrom<MessageData> for RecentMessage {
    type Error = RemoteError;

    fn try_from(data: MessageData) -> Result<Self, Self::Error> {
        let date = DateTime::from_timestamp(data.date, 0).ok_or_else(|| {
            RemoteError::Bridge(format!("message {} has invalid date {}", data.id, data.date))
        })?;
        Ok(RecentMessage { id: data.id, date })
    }
}
