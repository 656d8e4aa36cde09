use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use sweep_core::{
    BridgeCommand, DeleteHistory, Dialog, MessageData, NotifySettings, RecentMessage,
    RemoteError, RemoteResult, RemoteSession, SelfUser, SessionParams, SessionProvider,
};

use crate::bridge::{BridgeConfig, BridgeManager};
use crate::error::Result;

/// Opens sessions that are served by the shared bridge process.
#[derive(Clone)]
pub struct BridgeProvider {
    bridge: Arc<BridgeManager>,
}

impl BridgeProvider {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            bridge: Arc::new(BridgeManager::new(config)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        self.bridge.start().await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.bridge.stop().await
    }
}

#[async_trait]
impl SessionProvider for BridgeProvider {
    type Session = BridgeSession;

    async fn open(&self, params: SessionParams) -> RemoteResult<BridgeSession> {
        if !self.bridge.is_running().await {
            return Err(RemoteError::Bridge("bridge process is not running".to_string()));
        }
        Ok(BridgeSession {
            bridge: self.bridge.clone(),
            params,
        })
    }
}

pub struct BridgeSession {
    bridge: Arc<BridgeManager>,
    params: SessionParams,
}

#[derive(Deserialize)]
struct AuthorizedData {
    authorized: bool,
}

impl BridgeSession {
    async fn call(&self, command: BridgeCommand) -> RemoteResult<Option<serde_json::Value>> {
        match self.bridge.request(command).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(failure)) => Err(failure.into()),
            Err(e) => Err(RemoteError::Bridge(e.to_string())),
        }
    }

    async fn call_unit(&self, command: BridgeCommand) -> RemoteResult<()> {
        self.call(command).await.map(|_| ())
    }

    async fn call_decode<T: DeserializeOwned>(&self, command: BridgeCommand) -> RemoteResult<T> {
        let name = command.name();
        let data = self.call(command).await?.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data)
            .map_err(|e| RemoteError::Bridge(format!("bad {} reply: {}", name, e)))
    }
}

#[async_trait]
impl RemoteSession for BridgeSession {
    async fn connect(&self) -> RemoteResult<()> {
        tracing::debug!(phone_number = %self.params.phone_number, "Connecting session");
        self.call_unit(BridgeCommand::Connect {
            session_path: self.params.session_path.display().to_string(),
            api_id: self.params.api_id.clone(),
            api_hash: self.params.api_hash.clone(),
            proxy: self.params.proxy.clone(),
        })
        .await
    }

    async fn is_authorized(&self) -> RemoteResult<bool> {
        let data: AuthorizedData = self.call_decode(BridgeCommand::IsAuthorized).await?;
        Ok(data.authorized)
    }

    async fn request_login_code(&self, phone_number: &str) -> RemoteResult<()> {
        self.call_unit(BridgeCommand::RequestLoginCode {
            phone_number: phone_number.to_string(),
        })
        .await
    }

    async fn sign_in(&self, phone_number: &str, code: &str) -> RemoteResult<()> {
        self.call_unit(BridgeCommand::SignIn {
            phone_number: phone_number.to_string(),
            code: code.to_string(),
        })
        .await
    }

    async fn sign_in_password(&self, password: &str) -> RemoteResult<()> {
        self.call_unit(BridgeCommand::SignInPassword {
            password: password.to_string(),
        })
        .await
    }

    async fn get_self(&self) -> RemoteResult<SelfUser> {
        self.call_decode(BridgeCommand::GetSelf).await
    }

    async fn list_dialogs(&self) -> RemoteResult<Vec<Dialog>> {
        self.call_decode(BridgeCommand::ListDialogs).await
    }

    async fn get_recent_message(&self, dialog: &Dialog) -> RemoteResult<Option<RecentMessage>> {
        let data: Option<MessageData> = self
            .call_decode(BridgeCommand::GetRecentMessage {
                peer: dialog.into(),
            })
            .await?;
        data.map(RecentMessage::try_from).transpose()
    }

    async fn update_notify_settings(
        &self,
        dialog: &Dialog,
        settings: &NotifySettings,
    ) -> RemoteResult<()> {
        self.call_unit(BridgeCommand::UpdateNotifySettings {
            peer: dialog.into(),
            settings: settings.into(),
        })
        .await
    }

    async fn delete_history(&self, dialog: &Dialog, options: &DeleteHistory) -> RemoteResult<()> {
        self.call_unit(BridgeCommand::delete_history(dialog, options))
            .await
    }

    async fn leave_channel(&self, dialog: &Dialog) -> RemoteResult<()> {
        self.call_unit(BridgeCommand::LeaveChannel {
            peer: dialog.into(),
        })
        .await
    }

    async fn remove_self_from_group(&self, dialog: &Dialog) -> RemoteResult<()> {
        self.call_unit(BridgeCommand::RemoveSelfFromGroup {
            peer: dialog.into(),
        })
        .await
    }

    async fn disconnect(&self) -> RemoteResult<()> {
        tracing::debug!(phone_number = %self.params.phone_number, "Disconnecting session");
        self.call_unit(BridgeCommand::Disconnect).await
    }
}
