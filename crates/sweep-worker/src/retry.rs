use std::future::Future;
use std::time::Duration;

use sweep_core::{RemoteError, RemoteResult};
use tracing::warn;

/// Limits on waiting out rate-limit signals.
///
/// The default places no limit: the remote decides how long to wait and
/// the call is repeated until it stops throttling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: Option<u32>,
    pub max_total_wait: Option<Duration>,
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_retries.is_none() && self.max_total_wait.is_none()
    }

    fn allows(&self, retries: u32, waited: Duration, next_wait: Duration) -> bool {
        if self.max_retries.is_some_and(|max| retries >= max) {
            return false;
        }
        if self
            .max_total_wait
            .is_some_and(|max| waited + next_wait > max)
        {
            return false;
        }
        true
    }
}

/// Runs `call` until it returns something other than a rate-limit signal,
/// sleeping exactly the signalled duration between attempts.
///
/// `on_wait` runs before each sleep. When the policy refuses another wait,
/// the last rate-limit error is returned.
pub async fn retry_rate_limited<T, F, Fut, W, WFut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut call: F,
    mut on_wait: W,
) -> RemoteResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
    W: FnMut(Duration) -> WFut,
    WFut: Future<Output = ()>,
{
    let mut retries = 0u32;
    let mut waited = Duration::ZERO;

    loop {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let Some(wait) = err.retry_after() else {
            return Err(err);
        };

        if !policy.allows(retries, waited, wait) {
            warn!(
                operation,
                retries,
                waited_secs = waited.as_secs(),
                retry_after_secs = wait.as_secs(),
                "Rate limit persisted beyond retry policy"
            );
            return Err(RemoteError::RateLimited { wait });
        }

        retries += 1;
        warn!(
            operation,
            retries,
            retry_after_secs = wait.as_secs(),
            "Flood wait: waiting {} seconds before retrying",
            wait.as_secs()
        );
        on_wait(wait).await;
        tokio::time::sleep(wait).await;
        waited += wait;
    }
}
