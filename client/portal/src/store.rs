//! Client-side key/value storage.
//!
//! The engine never reaches for ambient global state: the auth token and
//! saved drafts are read through a [`KeyValueStore`] handed to it at
//! construction. [`SqliteStore`] persists across runs; [`MemoryStore`] is
//! the ephemeral variant used in tests.

use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::info;

use crate::errors::Result;

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_ROLE_KEY: &str = "userRole";
pub const USERNAME_KEY: &str = "username";
pub const DRAFTS_KEY: &str = "savedApplications";

/// String-keyed storage capability.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Store the bearer token used for authenticated requests.
pub async fn sign_in<S: KeyValueStore>(store: &S, token: &str) -> Result<()> {
    store.set(AUTH_TOKEN_KEY, token).await
}

/// Forget the identity keys. Drafts survive sign-out.
pub async fn sign_out<S: KeyValueStore>(store: &S) -> Result<()> {
    for key in [AUTH_TOKEN_KEY, USER_ROLE_KEY, USERNAME_KEY] {
        store.remove(key).await?;
    }
    Ok(())
}

/// A blank token counts as signed out.
pub async fn auth_token<S: KeyValueStore>(store: &S) -> Result<Option<String>> {
    Ok(store
        .get(AUTH_TOKEN_KEY)
        .await?
        .filter(|t| !t.trim().is_empty()))
}

// ─────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// SQLite store
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let url = if url.starts_with("sqlite:") {
            url.to_string()
        } else {
            format!("sqlite:{url}")
        };

        let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::migrate(pool).await
    }

    /// A private in-memory database. One connection, since every SQLite
    /// memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Store migrations applied successfully");
        Ok(SqliteStore { pool })
    }
}

impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE
                SET value = excluded.value,
                    updated_at = strftime('%s', 'now')
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
