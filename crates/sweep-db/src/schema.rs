pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    api_id TEXT NOT NULL,
    api_hash TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    username TEXT,
    proxy TEXT
);
"#;

/// Databases written before proxies existed lack the column.
pub const ADD_PROXY_COLUMN: &str = "ALTER TABLE accounts ADD COLUMN proxy TEXT";
