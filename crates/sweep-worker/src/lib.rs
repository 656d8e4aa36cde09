mod auth;
mod config;
mod error;
mod events;
mod retry;
mod sweep;
mod worker;

#[cfg(test)]
mod testing;

pub use auth::{LoginPrompt, NewAccount};
pub use config::{Config, WorkerSettings};
pub use error::WorkerError;
pub use events::{SweepEvent, SweepKind};
pub use retry::RetryPolicy;
pub use sweep::{
    DialogOutcome, FailedDialog, InactivityPeriod, SkipReason, SweepAction, SweepContext,
    SweepReport,
};
pub use worker::SweepWorker;

pub use sweep_core::{Dialog, DialogKind, MuteDuration, Proxy, ProxyKind};
pub use sweep_db::{Account, SweepDb};
pub use sweep_ipc::BridgeProvider;
