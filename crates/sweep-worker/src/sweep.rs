use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use sweep_core::{
    DeleteHistory, Dialog, DialogKind, MuteDuration, NotifySettings, RemoteError, RemoteResult,
    RemoteSession,
};
use sweep_db::Account;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::events::{SweepEvent, SweepKind};
use crate::retry::{RetryPolicy, retry_rate_limited};

/// How long a dialog must have been quiet before delete/leave touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivityPeriod(Duration);

impl InactivityPeriod {
    pub fn days(days: u32) -> Self {
        Self(Duration::days(i64::from(days)))
    }

    pub fn threshold(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.0
    }
}

/// Eligible only when the last message is strictly older than the threshold.
pub fn is_inactive(last_message: DateTime<Utc>, threshold: DateTime<Utc>) -> bool {
    last_message < threshold
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    Mute(MuteDuration),
    DeleteInactive(InactivityPeriod),
    LeaveInactive(InactivityPeriod),
}

impl SweepAction {
    pub fn kind(&self) -> SweepKind {
        match self {
            SweepAction::Mute(_) => SweepKind::Mute,
            SweepAction::DeleteInactive(_) => SweepKind::Delete,
            SweepAction::LeaveInactive(_) => SweepKind::Leave,
        }
    }

    /// Type filter applied before any per-dialog request.
    pub fn accepts(&self, dialog: &Dialog) -> bool {
        match self {
            SweepAction::Mute(_) => dialog.kind.is_channel(),
            SweepAction::DeleteInactive(_) => {
                dialog.kind == DialogKind::Direct || dialog.kind.is_group()
            }
            SweepAction::LeaveInactive(_) => dialog.kind.is_channel() || dialog.kind.is_group(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ServiceNotices,
    NoMessages,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Acted,
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDialog {
    pub id: i64,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub kind: SweepKind,
    pub total: usize,
    pub acted: usize,
    pub skipped: usize,
    pub failed: Vec<FailedDialog>,
}

impl SweepReport {
    fn new(kind: SweepKind, total: usize) -> Self {
        Self {
            kind,
            total,
            acted: 0,
            skipped: 0,
            failed: Vec::new(),
        }
    }

    fn record(&mut self, dialog: &Dialog, outcome: &DialogOutcome) {
        match outcome {
            DialogOutcome::Acted => self.acted += 1,
            DialogOutcome::Skipped(_) => self.skipped += 1,
            DialogOutcome::Failed(reason) => self.failed.push(FailedDialog {
                id: dialog.id,
                name: dialog.name.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

/// Per-sweep inputs. `now` is fixed when the sweep starts so every dialog
/// is judged against the same threshold.
#[derive(Debug, Clone)]
pub struct SweepContext {
    pub account: Account,
    pub now: DateTime<Utc>,
    pub retry: RetryPolicy,
}

impl SweepContext {
    pub fn new(account: Account, retry: RetryPolicy) -> Self {
        Self {
            account,
            now: Utc::now(),
            retry,
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

pub(crate) struct Sweeper<'a, S> {
    session: &'a S,
    ctx: &'a SweepContext,
    events: Option<&'a mpsc::Sender<SweepEvent>>,
}

impl<'a, S: RemoteSession> Sweeper<'a, S> {
    pub(crate) fn new(
        session: &'a S,
        ctx: &'a SweepContext,
        events: Option<&'a mpsc::Sender<SweepEvent>>,
    ) -> Self {
        Self {
            session,
            ctx,
            events,
        }
    }

    /// One pass over the session's dialogs. Permission failures are recorded
    /// per dialog; any other error ends the sweep.
    pub(crate) async fn run(&self, action: SweepAction) -> RemoteResult<SweepReport> {
        let kind = action.kind();
        let account = self.ctx.account.label();

        let dialogs = self
            .guarded(kind, "list_dialogs", || self.session.list_dialogs())
            .await?;
        let targets: Vec<Dialog> = dialogs.into_iter().filter(|d| action.accepts(d)).collect();
        let total = targets.len();

        info!(account, total, "Starting {} for account {}", kind, account);
        self.emit(SweepEvent::Started {
            kind,
            account: account.to_string(),
            total,
        })
        .await;

        let mut report = SweepReport::new(kind, total);

        for (index, dialog) in targets.iter().enumerate() {
            let outcome = match self.process(action, dialog).await {
                Ok(outcome) => outcome,
                Err(RemoteError::PermissionDenied(reason)) => {
                    warn!(
                        account,
                        dialog = %dialog.name,
                        dialog_id = dialog.id,
                        "Insufficient rights to {} {}",
                        kind,
                        dialog.name
                    );
                    DialogOutcome::Failed(reason)
                }
                Err(e) => return Err(e),
            };

            report.record(dialog, &outcome);
            self.emit(SweepEvent::Progress {
                kind,
                current: index + 1,
                total,
                dialog: dialog.name.clone(),
                outcome,
            })
            .await;
        }

        Ok(report)
    }

    async fn process(&self, action: SweepAction, dialog: &Dialog) -> RemoteResult<DialogOutcome> {
        let kind = action.kind();
        let account = self.ctx.account.label();

        match action {
            SweepAction::Mute(duration) => {
                let settings = NotifySettings::muted(duration.until(self.ctx.now));
                self.guarded(kind, "update_notify_settings", || {
                    self.session.update_notify_settings(dialog, &settings)
                })
                .await?;
                info!(account, dialog = %dialog.name, "Channel {} muted", dialog.name);
            }
            SweepAction::DeleteInactive(period) => {
                if dialog.is_service_notices() {
                    return Ok(DialogOutcome::Skipped(SkipReason::ServiceNotices));
                }
                if let Some(reason) = self.check_activity(kind, dialog, period).await? {
                    return Ok(DialogOutcome::Skipped(reason));
                }

                let options = DeleteHistory::revoke_all();
                self.guarded(kind, "delete_history", || {
                    self.session.delete_history(dialog, &options)
                })
                .await?;
                info!(
                    account,
                    dialog = %dialog.name,
                    "Chat with {} deleted for inactivity ({})",
                    dialog.name,
                    dialog.reference()
                );
            }
            SweepAction::LeaveInactive(period) => {
                if let Some(reason) = self.check_activity(kind, dialog, period).await? {
                    return Ok(DialogOutcome::Skipped(reason));
                }

                if dialog.kind.is_channel() {
                    self.guarded(kind, "leave_channel", || self.session.leave_channel(dialog))
                        .await?;
                    info!(
                        account,
                        dialog = %dialog.name,
                        "Left channel {} for inactivity ({})",
                        dialog.name,
                        dialog.reference()
                    );
                } else {
                    self.guarded(kind, "remove_self_from_group", || {
                        self.session.remove_self_from_group(dialog)
                    })
                    .await?;
                    info!(
                        account,
                        dialog = %dialog.name,
                        "Left group {} for inactivity ({})",
                        dialog.name,
                        dialog.reference()
                    );
                }
            }
        }

        Ok(DialogOutcome::Acted)
    }

    /// `None` when the dialog is old enough to act on.
    async fn check_activity(
        &self,
        kind: SweepKind,
        dialog: &Dialog,
        period: InactivityPeriod,
    ) -> RemoteResult<Option<SkipReason>> {
        let last = self
            .guarded(kind, "get_recent_message", || {
                self.session.get_recent_message(dialog)
            })
            .await?;

        let Some(last) = last else {
            return Ok(Some(SkipReason::NoMessages));
        };

        if is_inactive(last.date, period.threshold(self.ctx.now)) {
            Ok(None)
        } else {
            Ok(Some(SkipReason::Active))
        }
    }

    async fn guarded<T, F, Fut>(
        &self,
        kind: SweepKind,
        operation: &'static str,
        call: F,
    ) -> RemoteResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        retry_rate_limited(&self.ctx.retry, operation, call, |wait| {
            self.emit(SweepEvent::RateLimited {
                kind,
                operation,
                wait,
            })
        })
        .await
    }

    async fn emit(&self, event: SweepEvent) {
        if let Some(tx) = self.events {
            let _ = tx.send(event).await;
        }
    }
}
