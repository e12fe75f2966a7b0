//! User records and quota counters

use super::{now_secs, Store, StoreError, DEFAULT_VOUCHES};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user record. Created on first authentication; the quota counter is
/// decremented per vouch and reset externally at season boundaries.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub wallet: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub rank_score: f64,
    #[serde(rename = "vouchesAvailables")]
    pub vouches_available: i64,
    pub vouch_reset: Option<i64>,
    pub created_at: i64,
    pub agorapass_url: Option<String>,
}

/// Fields for user creation from a verified session
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub wallet: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
}

/// Public listing projection
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub wallet: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub rank_score: f64,
}

/// Sort direction for the listing, by rank score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One page of the user listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<UserSummary>,
    pub total: i64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u32>,
}

impl Store {
    /// Insert a user. Fails with `Conflict` when the id or wallet exists.
    pub async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let wallet = new.wallet.to_lowercase();
        let created_at = now_secs();

        sqlx::query(
            r#"
            INSERT INTO users (id, wallet, name, bio, email, vouches_available, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&new.id)
        .bind(&wallet)
        .bind(&new.name)
        .bind(&new.bio)
        .bind(&new.email)
        .bind(DEFAULT_VOUCHES)
        .bind(created_at)
        .execute(self.pool())
        .await
        .map_err(conflict_or_db)?;

        self.get_user(&new.id)
            .await?
            .ok_or_else(|| StoreError::Conflict("user vanished after insert".into()))
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// Lookup by wallet address, case-insensitive
    pub async fn get_user_by_wallet(&self, wallet: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE wallet = ?1")
            .bind(wallet.to_lowercase())
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// Update profile fields. `None` keeps the current value.
    pub async fn update_profile(
        &self,
        id: &str,
        name: Option<String>,
        bio: Option<String>,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE(?1, name),
                bio  = COALESCE(?2, bio)
            WHERE id = ?3
            "#,
        )
        .bind(name)
        .bind(bio)
        .bind(id)
        .execute(self.pool())
        .await?;

        self.get_user(id).await
    }

    /// Consume one vouch if any remain. Returns whether a vouch was
    /// consumed; `false` means the quota is exhausted. Atomic: the check
    /// and the decrement are one statement.
    pub async fn consume_vouch(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET vouches_available = vouches_available - 1 \
             WHERE id = ?1 AND vouches_available > 0",
        )
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Give back a consumed vouch (compensation after a failed relay submit)
    pub async fn restore_vouch(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET vouches_available = vouches_available + 1 WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Season-boundary reset hook
    pub async fn set_vouches_available(&self, id: &str, vouches: i64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET vouches_available = ?1, vouch_reset = ?2 WHERE id = ?3",
        )
        .bind(vouches)
        .bind(now_secs())
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Reputation-score hook for the external scoring job
    pub async fn set_rank_score(&self, id: &str, score: f64) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET rank_score = ?1 WHERE id = ?2")
            .bind(score)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Cache the derived-credential URL on the user row
    pub async fn set_agorapass_url(&self, id: &str, url: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET agorapass_url = ?1 WHERE id = ?2")
            .bind(url)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Paged listing sorted by rank score, optionally filtered by a
    /// case-insensitive name substring. Pages are 1-based.
    pub async fn list_users(
        &self,
        page: u32,
        limit: u32,
        sort: SortOrder,
        search: Option<&str>,
    ) -> Result<UserPage, StoreError> {
        let page = page.max(1);
        let offset = (page as i64 - 1) * limit as i64;
        let pattern = search
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let order = match sort {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        let list_sql = format!(
            "SELECT wallet, name, bio, email, rank_score FROM users \
             WHERE (?1 IS NULL OR name LIKE ?1 COLLATE NOCASE) \
             ORDER BY rank_score {order} \
             LIMIT ?2 OFFSET ?3"
        );

        let users = sqlx::query_as::<_, UserSummary>(&list_sql)
            .bind(&pattern)
            .bind(limit as i64)
            .bind(offset)
            .fetch_all(self.pool())
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE (?1 IS NULL OR name LIKE ?1 COLLATE NOCASE)",
        )
        .bind(&pattern)
        .fetch_one(self.pool())
        .await?;

        let has_more = offset + (limit as i64) < total;
        Ok(UserPage {
            users,
            total,
            has_more,
            next_page: has_more.then(|| page + 1),
        })
    }
}

fn conflict_or_db(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Database(err),
    }
}
