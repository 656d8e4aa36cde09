use serde::{Deserialize, Serialize};
use sweep_core::Proxy;

use crate::error::DbError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub api_id: String,
    pub api_hash: String,
    pub phone_number: String,
    pub username: Option<String>,
    pub proxy: Option<Proxy>,
}

impl Account {
    /// Label shown in menus and log lines.
    pub fn label(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.phone_number)
    }
}

/// Row as stored; the proxy is still in its flat string form.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AccountRow {
    pub id: i64,
    pub api_id: String,
    pub api_hash: String,
    pub phone_number: String,
    pub username: Option<String>,
    pub proxy: Option<String>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DbError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let proxy = row
            .proxy
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(str::parse::<Proxy>)
            .transpose()
            .map_err(|source| DbError::InvalidProxy {
                account_id: row.id,
                source,
            })?;

        Ok(Account {
            id: row.id,
            api_id: row.api_id,
            api_hash: row.api_hash,
            phone_number: row.phone_number,
            username: row.username,
            proxy,
        })
    }
}
