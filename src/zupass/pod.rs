//! Derived credential ("AgoraPass POD") issuance
//!
//! Two pieces: a local signer that produces the signed POD payload bound to
//! a wallet, and an HTTP client for the external credential-issuance service
//! that binds the user's reputation score. The signing key comes from the
//! environment; when it is absent the route fails closed instead of issuing
//! unsigned credentials.

use crate::attestation::typed_data::signature_to_hex;
use alloy::primitives::{keccak256, Address};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errors from POD signing and issuance
#[derive(Debug, Error)]
pub enum PodError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("credential service rejected request (status {0})")]
    Rejected(u16),

    #[error("credential service unreachable: {0}")]
    Transport(String),
}

/// A signed derived-credential payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPod {
    /// Stable id: UUIDv5 over the content hash
    pub id: Uuid,
    pub entries: serde_json::Value,
    /// Flat hex signature over the canonical entry hash
    pub signature: String,
    pub signer: Address,
}

impl SignedPod {
    /// Shareable URL for the credential
    pub fn url(&self) -> String {
        format!("https://zupass.org/#/add-pod/{}", self.id)
    }
}

/// Local POD signer over a configured private key
pub struct PodSigner {
    inner: PrivateKeySigner,
}

impl PodSigner {
    pub fn from_hex_key(key: &str) -> Result<Self, PodError> {
        let inner: PrivateKeySigner = key
            .trim()
            .parse()
            .map_err(|e: alloy::signers::local::LocalSignerError| {
                PodError::InvalidKey(e.to_string())
            })?;
        Ok(Self { inner })
    }

    /// Sign the fixed AgoraPass entry set for `owner` at `timestamp`.
    ///
    /// Entries are serialized in key order so the content hash (and the
    /// derived UUID) is stable for identical inputs.
    pub fn sign(&self, owner: &str, timestamp: u64) -> Result<SignedPod, PodError> {
        // json! with literal keys keeps insertion order; keys are already sorted
        let entries = json!({
            "issuer": "AgoraPass",
            "owner": owner,
            "timestamp": timestamp,
            "zupass_display": "collectable",
            "zupass_title": "AGORA",
        });

        let canonical =
            serde_json::to_string(&entries).map_err(|e| PodError::Signing(e.to_string()))?;
        let content_hash = keccak256(canonical.as_bytes());

        let signature = self
            .inner
            .sign_hash_sync(&content_hash)
            .map_err(|e| PodError::Signing(e.to_string()))?;

        Ok(SignedPod {
            id: Uuid::new_v5(&Uuid::NAMESPACE_DNS, content_hash.as_slice()),
            entries,
            signature: signature_to_hex(&signature),
            signer: self.inner.address(),
        })
    }
}

/// External credential-issuance seam
#[async_trait]
pub trait PodIssuer: Send + Sync {
    /// Forward the bearer token, wallet, and score to the issuance service
    /// and return its response body.
    async fn create_pod(
        &self,
        token: &str,
        wallet: &str,
        score: f64,
    ) -> Result<serde_json::Value, PodError>;
}

/// HTTP client for the stamp credential-issuance endpoint
#[derive(Clone)]
pub struct StampPodIssuer {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
}

impl StampPodIssuer {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
        }
    }
}

#[async_trait]
impl PodIssuer for StampPodIssuer {
    async fn create_pod(
        &self,
        token: &str,
        wallet: &str,
        score: f64,
    ) -> Result<serde_json::Value, PodError> {
        let url = format!("{}/pod/create", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", token)
            .header("x-privy-app-id", &self.app_id)
            .json(&json!({
                "wallet": wallet,
                "AgoraScore": score.to_string(),
            }))
            .send()
            .await
            .map_err(|e| PodError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PodError::Rejected(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| PodError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn signed_pod_is_deterministic() {
        let signer = PodSigner::from_hex_key(TEST_KEY).unwrap();

        let a = signer.sign("0xabc", 1_700_000_000).unwrap();
        let b = signer.sign("0xabc", 1_700_000_000).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.signature, b.signature);

        let c = signer.sign("0xabc", 1_700_000_001).unwrap();
        assert_ne!(a.id, c.id, "different timestamp, different credential");
    }

    #[test]
    fn signed_pod_carries_fixed_entries() {
        let signer = PodSigner::from_hex_key(TEST_KEY).unwrap();
        let pod = signer.sign("0xabc", 42).unwrap();

        assert_eq!(pod.entries["issuer"], "AgoraPass");
        assert_eq!(pod.entries["zupass_title"], "AGORA");
        assert_eq!(pod.entries["owner"], "0xabc");
        assert!(pod.url().contains(&pod.id.to_string()));
    }

    #[test]
    fn bad_key_is_rejected() {
        assert!(matches!(
            PodSigner::from_hex_key("zz"),
            Err(PodError::InvalidKey(_))
        ));
    }
}
