use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use sweep_core::Proxy;

use crate::error::{DbError, Result};
use crate::models::{Account, AccountRow};
use crate::schema::{ADD_PROXY_COLUMN, SCHEMA};

pub struct SweepDb {
    pool: Pool<Sqlite>,
}

impl SweepDb {
    /// Opens (creating if needed) the database file at `path`.
    pub async fn new_with_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let db = Self::connect(&db_url).await?;
        tracing::info!("Database initialized at: {}", path.display());
        Ok(db)
    }

    /// Connects to a sqlx SQLite url such as `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    /// Creates the accounts table if needed and upgrades tables that
    /// predate the proxy column.
    async fn initialize(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;

        let columns: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM pragma_table_info('accounts')")
                .fetch_all(&self.pool)
                .await?;

        if !columns.iter().any(|(name,)| name == "proxy") {
            tracing::info!("Adding proxy column to legacy accounts table");
            sqlx::query(ADD_PROXY_COLUMN).execute(&self.pool).await?;
        }

        Ok(())
    }

    pub async fn add_account(
        &self,
        api_id: &str,
        api_hash: &str,
        phone_number: &str,
        username: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO accounts (api_id, api_hash, phone_number, username) VALUES (?, ?, ?, ?)",
        )
        .bind(api_id)
        .bind(api_hash)
        .bind(phone_number)
        .bind(username)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::debug!(account_id = id, phone_number, "Account row inserted");
        Ok(id)
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT id, api_id, api_hash, phone_number, username, proxy FROM accounts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            match Account::try_from(row) {
                Ok(account) => accounts.push(account),
                Err(DbError::InvalidProxy { account_id, source }) => {
                    tracing::warn!(account_id, "Skipping account with unreadable proxy: {}", source);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(accounts)
    }

    pub async fn get_account_by_id(&self, id: i64) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, api_id, api_hash, phone_number, username, proxy FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn get_account(&self, id: i64) -> Result<Account> {
        self.get_account_by_id(id)
            .await?
            .ok_or(DbError::AccountNotFound(id))
    }

    /// Overwrites the proxy of one account; `None` clears it.
    pub async fn update_account_proxy(&self, id: i64, proxy: Option<&Proxy>) -> Result<()> {
        if let Some(proxy) = proxy {
            proxy
                .validate()
                .map_err(|source| DbError::InvalidProxy { account_id: id, source })?;
        }
        let encoded = proxy.map(ToString::to_string);

        let result = sqlx::query("UPDATE accounts SET proxy = ? WHERE id = ?")
            .bind(encoded)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::AccountNotFound(id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_core::{ProxyCredentials, ProxyKind, ProxyParseError};

    async fn test_db() -> SweepDb {
        SweepDb::connect("sqlite::memory:").await.unwrap()
    }

    fn socks_proxy() -> Proxy {
        Proxy {
            kind: ProxyKind::Socks5,
            host: "127.0.0.1".into(),
            port: 1080,
            credentials: Some(ProxyCredentials {
                username: "u".into(),
                password: "p".into(),
            }),
        }
    }

    #[tokio::test]
    async fn test_add_and_get_account() {
        let db = test_db().await;

        let id = db
            .add_account("12345", "abcdef", "+15550001", Some("alice"))
            .await
            .unwrap();
        let account = db.get_account_by_id(id).await.unwrap().unwrap();

        assert_eq!(account.id, id);
        assert_eq!(account.api_id, "12345");
        assert_eq!(account.api_hash, "abcdef");
        assert_eq!(account.phone_number, "+15550001");
        assert_eq!(account.username.as_deref(), Some("alice"));
        assert!(account.proxy.is_none());
    }

    #[tokio::test]
    async fn test_missing_account() {
        let db = test_db().await;
        assert!(db.get_account_by_id(99).await.unwrap().is_none());
        assert!(matches!(
            db.get_account(99).await,
            Err(DbError::AccountNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_list_in_insertion_order_with_duplicates() {
        let db = test_db().await;
        db.add_account("1", "h1", "+1", Some("first")).await.unwrap();
        db.add_account("2", "h2", "+1", None).await.unwrap();

        let accounts = db.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].username.as_deref(), Some("first"));
        assert_eq!(accounts[1].phone_number, "+1");
        assert!(accounts[0].id < accounts[1].id);
    }

    #[tokio::test]
    async fn test_proxy_set_and_clear() {
        let db = test_db().await;
        let id = db.add_account("1", "h", "+1", None).await.unwrap();

        db.update_account_proxy(id, Some(&socks_proxy())).await.unwrap();
        let account = db.get_account(id).await.unwrap();
        assert_eq!(account.proxy, Some(socks_proxy()));

        db.update_account_proxy(id, None).await.unwrap();
        let account = db.get_account(id).await.unwrap();
        assert!(account.proxy.is_none());
    }

    #[tokio::test]
    async fn test_proxy_stored_as_flat_string() {
        let db = test_db().await;
        let id = db.add_account("1", "h", "+1", None).await.unwrap();
        db.update_account_proxy(id, Some(&socks_proxy())).await.unwrap();

        let (raw,): (String,) = sqlx::query_as("SELECT proxy FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(raw, "socks5,127.0.0.1,1080,u,p");
    }

    #[tokio::test]
    async fn test_update_proxy_of_missing_account() {
        let db = test_db().await;
        assert!(matches!(
            db.update_account_proxy(7, None).await,
            Err(DbError::AccountNotFound(7))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_proxy_is_reported() {
        let db = test_db().await;
        let id = db.add_account("1", "h", "+1", None).await.unwrap();
        sqlx::query("UPDATE accounts SET proxy = 'gopher,host' WHERE id = ?")
            .bind(id)
            .execute(&db.pool)
            .await
            .unwrap();

        assert!(matches!(
            db.get_account(id).await,
            Err(DbError::InvalidProxy { account_id, .. }) if account_id == id
        ));
    }

    #[tokio::test]
    async fn test_proxy_with_comma_is_not_stored() {
        let db = test_db().await;
        let id = db.add_account("1", "h", "+1", None).await.unwrap();
        db.update_account_proxy(id, Some(&socks_proxy())).await.unwrap();

        let mut proxy = socks_proxy();
        proxy.credentials = Some(ProxyCredentials {
            username: "u".into(),
            password: "a,b".into(),
        });
        assert!(matches!(
            db.update_account_proxy(id, Some(&proxy)).await,
            Err(DbError::InvalidProxy {
                source: ProxyParseError::Delimiter("password"),
                ..
            })
        ));

        // The previous value is untouched and still readable.
        assert_eq!(db.get_account(id).await.unwrap().proxy, Some(socks_proxy()));
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_proxy_rows() {
        let db = test_db().await;
        let good = db.add_account("1", "h", "+1", Some("good")).await.unwrap();
        let bad = db.add_account("2", "h", "+2", Some("bad")).await.unwrap();
        sqlx::query("UPDATE accounts SET proxy = 'socks5,h,1080,u,a,b' WHERE id = ?")
            .bind(bad)
            .execute(&db.pool)
            .await
            .unwrap();

        let accounts = db.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, good);
    }

    #[tokio::test]
    async fn test_legacy_table_gains_proxy_column() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::raw_sql(
            "CREATE TABLE accounts (
                id INTEGER PRIMARY KEY,
                api_id TEXT NOT NULL,
                api_hash TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                username TEXT
            );
            INSERT INTO accounts (api_id, api_hash, phone_number, username)
            VALUES ('1', 'h', '+1', 'old');",
        )
        .execute(&pool)
        .await
        .unwrap();

        let db = SweepDb::from_pool(pool).await.unwrap();
        let accounts = db.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert!(accounts[0].proxy.is_none());

        db.update_account_proxy(accounts[0].id, Some(&socks_proxy()))
            .await
            .unwrap();

        // Initializing twice is harmless.
        let again = SweepDb::from_pool(db.pool.clone()).await.unwrap();
        assert!(again.get_account(accounts[0].id).await.unwrap().proxy.is_some());
    }
}
