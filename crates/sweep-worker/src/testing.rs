use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sweep_core::{
    DeleteHistory, Dialog, DialogKind, NotifySettings, RecentMessage, RemoteError, RemoteResult,
    RemoteSession, SelfUser, SessionParams, SessionProvider,
};
use sweep_db::Account;
use tokio::time::Instant;

use crate::auth::LoginPrompt;
use crate::error::{Result, WorkerError};

pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn account() -> Account {
    Account {
        id: 1,
        api_id: "1000".into(),
        api_hash: "hash".into(),
        phone_number: "+15550100".into(),
        username: Some("tester".into()),
        proxy: None,
    }
}

pub fn dialog(id: i64, kind: DialogKind) -> Dialog {
    Dialog {
        id,
        kind,
        name: format!("dialog-{}", id),
        username: None,
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub op: &'static str,
    pub dialog: Option<i64>,
    pub at: Instant,
}

#[derive(Default)]
struct FakeState {
    dialogs: Vec<Dialog>,
    last_messages: HashMap<i64, DateTime<Utc>>,
    failures: HashMap<(&'static str, Option<i64>), VecDeque<RemoteError>>,
    calls: Vec<Call>,
    mutes: Vec<(i64, NotifySettings)>,
    authorized: bool,
    password: Option<String>,
    self_user: Option<SelfUser>,
}

/// Scriptable in-memory session. Clones share state.
#[derive(Clone, Default)]
pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSession {
    pub fn new(dialogs: Vec<Dialog>) -> Self {
        let session = Self::default();
        {
            let mut state = session.state();
            state.dialogs = dialogs;
            state.authorized = true;
            state.self_user = Some(SelfUser {
                id: 4242,
                username: None,
            });
        }
        session
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn set_last_message(&self, dialog_id: i64, date: DateTime<Utc>) {
        self.state().last_messages.insert(dialog_id, date);
    }

    pub fn set_unauthorized(&self, password: Option<&str>) {
        let mut state = self.state();
        state.authorized = false;
        state.password = password.map(Into::into);
    }

    pub fn set_self_user(&self, user: SelfUser) {
        self.state().self_user = Some(user);
    }

    /// The next call of `op` on `dialog_id` fails with `err`.
    pub fn fail_next(&self, op: &'static str, dialog_id: i64, err: RemoteError) {
        self.state()
            .failures
            .entry((op, Some(dialog_id)))
            .or_default()
            .push_back(err);
    }

    pub fn fail_next_global(&self, op: &'static str, err: RemoteError) {
        self.state()
            .failures
            .entry((op, None))
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn ops(&self) -> Vec<&'static str> {
        self.state().calls.iter().map(|c| c.op).collect()
    }

    pub fn calls_named(&self, op: &str) -> usize {
        self.state().calls.iter().filter(|c| c.op == op).count()
    }

    pub fn dialogs_called(&self, op: &str) -> Vec<i64> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.op == op)
            .filter_map(|c| c.dialog)
            .collect()
    }

    pub fn timed_calls(&self, op: &str, dialog_id: i64) -> Vec<Instant> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.op == op && c.dialog == Some(dialog_id))
            .map(|c| c.at)
            .collect()
    }

    pub fn mutes(&self) -> Vec<(i64, NotifySettings)> {
        self.state().mutes.clone()
    }

    pub fn deleted(&self) -> Vec<i64> {
        self.dialogs_called("delete_history")
    }

    fn record(&self, op: &'static str, dialog: Option<i64>) -> RemoteResult<()> {
        let mut state = self.state();
        state.calls.push(Call {
            op,
            dialog,
            at: Instant::now(),
        });
        match state
            .failures
            .get_mut(&(op, dialog))
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn connect(&self) -> RemoteResult<()> {
        self.record("connect", None)
    }

    async fn is_authorized(&self) -> RemoteResult<bool> {
        self.record("is_authorized", None)?;
        Ok(self.state().authorized)
    }

    async fn request_login_code(&self, _phone_number: &str) -> RemoteResult<()> {
        self.record("request_login_code", None)
    }

    async fn sign_in(&self, _phone_number: &str, code: &str) -> RemoteResult<()> {
        self.record("sign_in", None)?;
        if code != "12345" {
            return Err(RemoteError::Other("PHONE_CODE_INVALID".into()));
        }
        let mut state = self.state();
        if state.password.is_some() {
            return Err(RemoteError::PasswordRequired);
        }
        state.authorized = true;
        Ok(())
    }

    async fn sign_in_password(&self, password: &str) -> RemoteResult<()> {
        self.record("sign_in_password", None)?;
        let mut state = self.state();
        if state.password.as_deref() != Some(password) {
            return Err(RemoteError::Other("PASSWORD_HASH_INVALID".into()));
        }
        state.authorized = true;
        Ok(())
    }

    async fn get_self(&self) -> RemoteResult<SelfUser> {
        self.record("get_self", None)?;
        self.state()
            .self_user
            .clone()
            .ok_or_else(|| RemoteError::Other("no user".into()))
    }

    async fn list_dialogs(&self) -> RemoteResult<Vec<Dialog>> {
        self.record("list_dialogs", None)?;
        Ok(self.state().dialogs.clone())
    }

    async fn get_recent_message(&self, dialog: &Dialog) -> RemoteResult<Option<RecentMessage>> {
        self.record("get_recent_message", Some(dialog.id))?;
        Ok(self
            .state()
            .last_messages
            .get(&dialog.id)
            .map(|date| RecentMessage { id: 1, date: *date }))
    }

    async fn update_notify_settings(
        &self,
        dialog: &Dialog,
        settings: &NotifySettings,
    ) -> RemoteResult<()> {
        self.record("update_notify_settings", Some(dialog.id))?;
        self.state().mutes.push((dialog.id, *settings));
        Ok(())
    }

    async fn delete_history(&self, dialog: &Dialog, options: &DeleteHistory) -> RemoteResult<()> {
        assert_eq!(*options, DeleteHistory::revoke_all());
        self.record("delete_history", Some(dialog.id))
    }

    async fn leave_channel(&self, dialog: &Dialog) -> RemoteResult<()> {
        self.record("leave_channel", Some(dialog.id))
    }

    async fn remove_self_from_group(&self, dialog: &Dialog) -> RemoteResult<()> {
        self.record("remove_self_from_group", Some(dialog.id))
    }

    async fn disconnect(&self) -> RemoteResult<()> {
        self.record("disconnect", None)
    }
}

/// Hands out clones of one fake session and remembers what it was asked for.
#[derive(Clone, Default)]
pub struct FakeProvider {
    pub session: FakeSession,
    opened: Arc<Mutex<Vec<SessionParams>>>,
}

impl FakeProvider {
    pub fn new(session: FakeSession) -> Self {
        Self {
            session,
            opened: Arc::default(),
        }
    }

    pub fn opened(&self) -> Vec<SessionParams> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    type Session = FakeSession;

    async fn open(&self, params: SessionParams) -> RemoteResult<FakeSession> {
        self.opened.lock().unwrap().push(params);
        Ok(self.session.clone())
    }
}

pub struct FakePrompt {
    pub code: &'static str,
    pub password: Option<&'static str>,
}

impl LoginPrompt for FakePrompt {
    fn login_code(&self, _phone_number: &str) -> Result<String> {
        Ok(self.code.to_string())
    }

    fn password(&self) -> Result<String> {
        self.password
            .map(str::to_string)
            .ok_or_else(|| WorkerError::Prompt("no password scripted".into()))
    }
}
