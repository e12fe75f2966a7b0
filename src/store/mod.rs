//! SQLite persistence for users and linked credentials
//!
//! The pool is constructed explicitly at startup and injected into the
//! server state; `close()` flushes it on shutdown. Schema migration is
//! idempotent and runs before the listener binds.
//!
//! Quota consumption is a single conditional UPDATE (`decrement if > 0`)
//! so concurrent vouch requests cannot drive the counter negative.

pub mod credentials;
pub mod users;

pub use credentials::LinkedCredential;
pub use users::{NewUser, SortOrder, User, UserPage, UserSummary};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use thiserror::Error;

/// Vouches granted to a freshly created account
pub const DEFAULT_VOUCHES: i64 = 3;

/// Errors from the datastore
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique-constraint violation (duplicate wallet, duplicate credential)
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Handle over the SQLite pool. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database file and run migrations
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory database for tests. Single connection: each connection to
    /// `sqlite::memory:` is otherwise its own database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Flush and close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id                TEXT PRIMARY KEY,
                wallet            TEXT NOT NULL UNIQUE,
                name              TEXT,
                bio               TEXT,
                email             TEXT,
                rank_score        REAL NOT NULL DEFAULT 0,
                vouches_available INTEGER NOT NULL,
                vouch_reset       INTEGER,
                created_at        INTEGER NOT NULL,
                agorapass_url     TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS zupass_credentials (
                attestation_uid TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id),
                nullifier       TEXT NOT NULL,
                ticket_type     TEXT NOT NULL,
                issuer          TEXT,
                category        TEXT,
                subcategory     TEXT,
                platform        TEXT,
                UNIQUE (nullifier, ticket_type)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Current unix time in seconds
pub(crate) fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agorapass.db");

        let store = Store::open(&path).await.unwrap();
        store
            .create_user(NewUser {
                id: "u-1".into(),
                wallet: "0xabc".into(),
                name: Some("Alice".into()),
                bio: None,
                email: None,
            })
            .await
            .unwrap();
        store.close().await;

        let reopened = Store::open(&path).await.unwrap();
        let user = reopened.get_user("u-1").await.unwrap().unwrap();
        assert_eq!(user.wallet, "0xabc");
        assert_eq!(user.vouches_available, DEFAULT_VOUCHES);
    }

    #[tokio::test]
    async fn migration_is_idempotent() {
        let store = Store::open_in_memory().await.unwrap();
        store.migrate().await.unwrap();
        store.migrate().await.unwrap();
    }
}
