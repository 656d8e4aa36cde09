use std::sync::Arc;

use sweep_core::{MuteDuration, Proxy, RemoteSession, SessionParams, SessionProvider};
use sweep_db::{Account, DbError, SweepDb};
use tokio::sync::mpsc;

use crate::auth::{LoginPrompt, NewAccount, ensure_authorized};
use crate::config::WorkerSettings;
use crate::error::{Result, WorkerError};
use crate::events::SweepEvent;
use crate::sweep::{InactivityPeriod, SweepAction, SweepContext, SweepReport, Sweeper};

/// Entry point for everything the menu can do.
///
/// Each operation opens its own session and closes it when done; nothing
/// about the selected account is kept here. Progress events are only sent
/// once the receiver has been taken.
pub struct SweepWorker<P> {
    db: Arc<SweepDb>,
    provider: P,
    settings: WorkerSettings,
    event_tx: mpsc::Sender<SweepEvent>,
    event_rx: Option<mpsc::Receiver<SweepEvent>>,
}

impl<P: SessionProvider> SweepWorker<P> {
    pub fn new(db: SweepDb, provider: P, settings: WorkerSettings) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1000);

        Self {
            db: Arc::new(db),
            provider,
            settings,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<SweepEvent>> {
        self.event_rx.take()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The event sender, if anyone is listening.
    fn events(&self) -> Option<&mpsc::Sender<SweepEvent>> {
        if self.event_rx.is_some() || self.event_tx.is_closed() {
            None
        } else {
            Some(&self.event_tx)
        }
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.db.list_accounts().await?)
    }

    pub async fn get_account(&self, account_id: i64) -> Result<Account> {
        self.db.get_account(account_id).await.map_err(not_found)
    }

    pub async fn set_proxy(&self, account_id: i64, proxy: Option<&Proxy>) -> Result<Account> {
        self.db
            .update_account_proxy(account_id, proxy)
            .await
            .map_err(not_found)?;

        match proxy {
            Some(p) => tracing::info!(account_id, "Proxy set to {}://{}:{}", p.kind.as_str(), p.host, p.port),
            None => tracing::info!(account_id, "Proxy cleared"),
        }
        self.get_account(account_id).await
    }

    /// Logs in with fresh credentials and stores the account.
    pub async fn register_account(
        &self,
        new_account: NewAccount,
        prompt: &dyn LoginPrompt,
    ) -> Result<Account> {
        let session = self
            .provider
            .open(SessionParams {
                api_id: new_account.api_id.clone(),
                api_hash: new_account.api_hash.clone(),
                phone_number: new_account.phone_number.clone(),
                session_path: self.settings.session_path(&new_account.phone_number),
                proxy: None,
            })
            .await?;

        session.connect().await?;
        ensure_authorized(&session, &new_account.phone_number, prompt).await?;

        let me = session.get_self().await?;
        let username = me.display_name();
        let id = self
            .db
            .add_account(
                &new_account.api_id,
                &new_account.api_hash,
                &new_account.phone_number,
                Some(&username),
            )
            .await?;
        tracing::info!(account_id = id, "Account {} added", username);

        session.disconnect().await?;
        self.get_account(id).await
    }

    pub async fn mute_all_channels(
        &self,
        account: &Account,
        duration: MuteDuration,
        prompt: &dyn LoginPrompt,
    ) -> Result<SweepReport> {
        let ctx = SweepContext::new(account.clone(), self.settings.retry);
        self.sweep(ctx, SweepAction::Mute(duration), prompt).await
    }

    pub async fn delete_inactive_chats(
        &self,
        account: &Account,
        period: InactivityPeriod,
        prompt: &dyn LoginPrompt,
    ) -> Result<SweepReport> {
        let ctx = SweepContext::new(account.clone(), self.settings.retry);
        self.sweep(ctx, SweepAction::DeleteInactive(period), prompt)
            .await
    }

    pub async fn leave_inactive(
        &self,
        account: &Account,
        period: InactivityPeriod,
        prompt: &dyn LoginPrompt,
    ) -> Result<SweepReport> {
        let ctx = SweepContext::new(account.clone(), self.settings.retry);
        self.sweep(ctx, SweepAction::LeaveInactive(period), prompt)
            .await
    }

    /// Connects, runs one sweep and disconnects. An error that ends the
    /// sweep is returned as is, without disconnecting.
    pub async fn sweep(
        &self,
        ctx: SweepContext,
        action: SweepAction,
        prompt: &dyn LoginPrompt,
    ) -> Result<SweepReport> {
        let session = self.open_session(&ctx.account, prompt).await?;

        let report = Sweeper::new(&session, &ctx, self.events())
            .run(action)
            .await?;

        if let Err(e) = session.disconnect().await {
            tracing::warn!(account = ctx.account.label(), "Disconnect after sweep failed: {}", e);
        }

        tracing::info!(
            account = ctx.account.label(),
            total = report.total,
            acted = report.acted,
            skipped = report.skipped,
            failed = report.failed.len(),
            "Finished {}",
            report.kind
        );
        if let Some(tx) = self.events() {
            let _ = tx
                .send(SweepEvent::Completed {
                    account: ctx.account.label().to_string(),
                    report: report.clone(),
                })
                .await;
        }

        Ok(report)
    }

    async fn open_session(&self, account: &Account, prompt: &dyn LoginPrompt) -> Result<P::Session> {
        let session = self
            .provider
            .open(SessionParams {
                api_id: account.api_id.clone(),
                api_hash: account.api_hash.clone(),
                phone_number: account.phone_number.clone(),
                session_path: self.settings.session_path(&account.phone_number),
                proxy: account.proxy.clone(),
            })
            .await?;

        session.connect().await?;
        ensure_authorized(&session, &account.phone_number, prompt).await?;
        Ok(session)
    }
}

fn not_found(err: DbError) -> WorkerError {
    match err {
        DbError::AccountNotFound(id) => WorkerError::AccountNotFound(id),
        other => WorkerError::Db(other),
    }
}
