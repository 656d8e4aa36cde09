use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Peer id of the platform's official service-notice chat.
pub const SERVICE_NOTICES_ID: i64 = 777000;

/// Wire value the platform uses for "muted forever".
pub const MUTE_FOREVER: i64 = i32::MAX as i64;

/// `Supergroup` is a group hosted as a channel: it is muted like a channel,
/// its history can be cleared like a group, and leaving it is a channel leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogKind {
    Direct,
    Group,
    Supergroup,
    Channel,
}

impl DialogKind {
    /// Channel-hosted peers: broadcast channels and supergroups.
    pub fn is_channel(&self) -> bool {
        matches!(self, DialogKind::Channel | DialogKind::Supergroup)
    }

    /// Group chats of either flavour.
    pub fn is_group(&self) -> bool {
        matches!(self, DialogKind::Group | DialogKind::Supergroup)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub id: i64,
    pub kind: DialogKind,
    pub name: String,
    pub username: Option<String>,
}

impl Dialog {
    pub fn is_service_notices(&self) -> bool {
        self.id == SERVICE_NOTICES_ID
    }

    /// Public link for dialogs that have a handle.
    pub fn link(&self) -> Option<String> {
        self.username
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| format!("https://t.me/{}", u))
    }

    /// Link if public, otherwise the numeric id. Used in log lines.
    pub fn reference(&self) -> String {
        self.link().unwrap_or_else(|| format!("ID: {}", self.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentMessage {
    pub id: i64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfUser {
    pub id: i64,
    pub username: Option<String>,
}

impl SelfUser {
    /// Handle if present, otherwise the numeric identity.
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.id.to_string(),
        }
    }
}

/// How long a mute lasts, in whole minutes. Zero means indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuteDuration(u32);

impl MuteDuration {
    pub fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    pub fn is_forever(&self) -> bool {
        self.0 == 0
    }

    pub fn until(&self, now: DateTime<Utc>) -> MuteUntil {
        if self.is_forever() {
            MuteUntil::Forever
        } else {
            MuteUntil::At(now + Duration::minutes(i64::from(self.0)))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteUntil {
    Forever,
    At(DateTime<Utc>),
}

impl MuteUntil {
    pub fn to_wire(&self) -> i64 {
        match self {
            MuteUntil::Forever => MUTE_FOREVER,
            MuteUntil::At(at) => at.timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifySettings {
    pub show_previews: bool,
    pub silent: bool,
    pub mute_until: MuteUntil,
}

impl NotifySettings {
    /// Silent, no previews, until the given moment.
    pub fn muted(mute_until: MuteUntil) -> Self {
        Self {
            show_previews: false,
            silent: true,
            mute_until,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteHistory {
    pub max_id: i64,
    pub just_clear: bool,
    pub revoke: bool,
}

impl DeleteHistory {
    /// Whole history, removed for both participants.
    pub fn revoke_all() -> Self {
        Self {
            max_id: 0,
            just_clear: false,
            revoke: true,
        }
    }
}
