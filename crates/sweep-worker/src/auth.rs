use sweep_core::{RemoteError, RemoteSession};
use tracing::info;

use crate::error::Result;

/// Source of interactive login input.
pub trait LoginPrompt: Send + Sync {
    fn login_code(&self, phone_number: &str) -> Result<String>;

    fn password(&self) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub api_id: String,
    pub api_hash: String,
    pub phone_number: String,
}

/// Logs the session in if it is not authorized yet. A two-step
/// verification password is asked for only when the platform demands one.
pub async fn ensure_authorized<S: RemoteSession>(
    session: &S,
    phone_number: &str,
    prompt: &dyn LoginPrompt,
) -> Result<()> {
    if session.is_authorized().await? {
        return Ok(());
    }

    info!(phone_number, "Session not authorized, requesting login code");
    session.request_login_code(phone_number).await?;
    let code = prompt.login_code(phone_number)?;

    match session.sign_in(phone_number, code.trim()).await {
        Ok(()) => {}
        Err(RemoteError::PasswordRequired) => {
            info!(phone_number, "Two-step verification enabled, asking for password");
            let password = prompt.password()?;
            session.sign_in_password(&password).await?;
        }
        Err(e) => return Err(e.into()),
    }

    info!(phone_number, "Session authorized");
    Ok(())
}
