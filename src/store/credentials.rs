//! Linked ticket credentials (Zupass records)
//!
//! A (nullifier, ticket_type) pair binds to at most one user. The
//! pre-submission index check is best-effort; the UNIQUE constraint here is
//! the backstop against a race between check and attestation.

use super::{Store, StoreError};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A verified external ticket bound to a user
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedCredential {
    pub attestation_uid: String,
    pub user_id: String,
    pub nullifier: String,
    pub ticket_type: String,
    pub issuer: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub platform: Option<String>,
}

impl Store {
    /// Insert the credential unless its (nullifier, ticket_type) pair is
    /// already bound. Returns whether a row was inserted; `false` means the
    /// credential was already linked (to this or another user).
    pub async fn link_credential(&self, cred: &LinkedCredential) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO zupass_credentials
                (attestation_uid, user_id, nullifier, ticket_type,
                 issuer, category, subcategory, platform)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (nullifier, ticket_type) DO NOTHING
            "#,
        )
        .bind(&cred.attestation_uid)
        .bind(&cred.user_id)
        .bind(&cred.nullifier)
        .bind(&cred.ticket_type)
        .bind(&cred.issuer)
        .bind(&cred.category)
        .bind(&cred.subcategory)
        .bind(&cred.platform)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Upsert keyed by attestation UID (re-save after metadata changes)
    pub async fn upsert_credential(&self, cred: &LinkedCredential) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO zupass_credentials
                (attestation_uid, user_id, nullifier, ticket_type,
                 issuer, category, subcategory, platform)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (attestation_uid) DO UPDATE SET
                user_id     = excluded.user_id,
                nullifier   = excluded.nullifier,
                ticket_type = excluded.ticket_type,
                issuer      = excluded.issuer,
                category    = excluded.category,
                subcategory = excluded.subcategory,
                platform    = excluded.platform
            "#,
        )
        .bind(&cred.attestation_uid)
        .bind(&cred.user_id)
        .bind(&cred.nullifier)
        .bind(&cred.ticket_type)
        .bind(&cred.issuer)
        .bind(&cred.category)
        .bind(&cred.subcategory)
        .bind(&cred.platform)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// First linked credential for a user, if any
    pub async fn credential_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<LinkedCredential>, StoreError> {
        let cred = sqlx::query_as::<_, LinkedCredential>(
            "SELECT * FROM zupass_credentials WHERE user_id = ?1 LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(cred)
    }

    /// Credential by its uniqueness key
    pub async fn credential_by_nullifier(
        &self,
        nullifier: &str,
        ticket_type: &str,
    ) -> Result<Option<LinkedCredential>, StoreError> {
        let cred = sqlx::query_as::<_, LinkedCredential>(
            "SELECT * FROM zupass_credentials WHERE nullifier = ?1 AND ticket_type = ?2",
        )
        .bind(nullifier)
        .bind(ticket_type)
        .fetch_optional(self.pool())
        .await?;
        Ok(cred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewUser;

    async fn store_with_user(id: &str, wallet: &str) -> Store {
        let store = Store::open_in_memory().await.unwrap();
        store
            .create_user(NewUser {
                id: id.into(),
                wallet: wallet.into(),
                name: None,
                bio: None,
                email: None,
            })
            .await
            .unwrap();
        store
    }

    fn credential(user_id: &str, uid: &str) -> LinkedCredential {
        LinkedCredential {
            attestation_uid: uid.into(),
            user_id: user_id.into(),
            nullifier: "0xnull1".into(),
            ticket_type: "GA".into(),
            issuer: Some("Devconnect".into()),
            category: Some("Community".into()),
            subcategory: Some("GA".into()),
            platform: Some("Zupass".into()),
        }
    }

    #[tokio::test]
    async fn link_is_first_writer_wins() {
        let store = store_with_user("u1", "0x0000000000000000000000000000000000000001").await;

        assert!(store.link_credential(&credential("u1", "0xa")).await.unwrap());
        // Same nullifier + ticket type, different attestation: refused
        assert!(!store.link_credential(&credential("u1", "0xb")).await.unwrap());

        let stored = store
            .credential_by_nullifier("0xnull1", "GA")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.attestation_uid, "0xa");
    }

    #[tokio::test]
    async fn different_ticket_type_is_a_distinct_credential() {
        let store = store_with_user("u1", "0x0000000000000000000000000000000000000001").await;

        assert!(store.link_credential(&credential("u1", "0xa")).await.unwrap());

        let mut speaker = credential("u1", "0xb");
        speaker.ticket_type = "Speaker".into();
        speaker.subcategory = Some("Speaker".into());
        assert!(store.link_credential(&speaker).await.unwrap());
    }

    #[tokio::test]
    async fn upsert_updates_metadata() {
        let store = store_with_user("u1", "0x0000000000000000000000000000000000000001").await;
        store.upsert_credential(&credential("u1", "0xa")).await.unwrap();

        let mut updated = credential("u1", "0xa");
        updated.issuer = Some("ZuVillage".into());
        store.upsert_credential(&updated).await.unwrap();

        let stored = store.credential_for_user("u1").await.unwrap().unwrap();
        assert_eq!(stored.issuer.as_deref(), Some("ZuVillage"));
    }
}
