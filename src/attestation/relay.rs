//! Attestation relay client
//!
//! The relay holds the server-side EAS connection: it hands out signing
//! nonces and submits delegated attestations on-chain from an off-chain
//! signature. Both operations ride the same trait so tests can swap in
//! [`crate::attestation::mock::MockRelay`].
//!
//! Nonces are monotonic per attester. A nonce must be fetched immediately
//! before signing: any concurrent submission from the same attester
//! invalidates a previously fetched value (the chain rejects the signature,
//! state is never corrupted).

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors from the nonce endpoint
#[derive(Debug, Error)]
pub enum NonceError {
    /// Transport failure or non-success status. The vouch flow must abort:
    /// signing with a stale or guessed nonce fails at the chain.
    #[error("nonce unavailable: {0}")]
    Unavailable(String),
}

/// Errors from attestation submission
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay rejected attestation (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("relay transport error: {0}")]
    Transport(String),
}

/// A signed delegated attestation ready for relay submission
#[derive(Debug, Clone)]
pub struct DelegatedAttestation {
    pub schema: B256,
    pub recipient: Address,
    pub attester: Address,
    /// Flat 65-byte signature, 0x-prefixed hex
    pub signature: String,
    /// ABI-encoded claim payload
    pub data: Vec<u8>,
    pub nonce: u64,
}

/// Relay seam: nonce source plus delegated submission
#[async_trait]
pub trait AttestationRelay: Send + Sync {
    /// Next valid signing nonce for the attester. Integer >= 0, monotonic.
    async fn nonce(&self, attester: Address) -> Result<u64, NonceError>;

    /// Submit a signed delegated attestation. Consumes one unit of quota on
    /// the relay side and returns the new attestation UID. Not idempotent:
    /// never retried blindly on ambiguous failures.
    async fn submit(
        &self,
        token: &str,
        attestation: &DelegatedAttestation,
    ) -> Result<String, RelayError>;
}

#[derive(Deserialize)]
struct NonceResponse {
    #[serde(rename = "easNonce")]
    eas_nonce: u64,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(rename = "newAttestationUID")]
    new_attestation_uid: String,
}

/// HTTP relay client against the stamp API
#[derive(Clone)]
pub struct StampRelay {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
}

impl StampRelay {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
        }
    }
}

#[async_trait]
impl AttestationRelay for StampRelay {
    async fn nonce(&self, attester: Address) -> Result<u64, NonceError> {
        let url = format!("{}/attestation/nonce?attester={:#x}", self.base_url, attester);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| NonceError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NonceError::Unavailable(format!(
                "status {}",
                response.status()
            )));
        }

        let body: NonceResponse = response
            .json()
            .await
            .map_err(|e| NonceError::Unavailable(e.to_string()))?;

        Ok(body.eas_nonce)
    }

    async fn submit(
        &self,
        token: &str,
        attestation: &DelegatedAttestation,
    ) -> Result<String, RelayError> {
        let url = format!("{}/attestation", self.base_url);
        let body = json!({
            "schema": format!("{:#x}", attestation.schema),
            "recipient": format!("{:#x}", attestation.recipient),
            "attester": format!("{:#x}", attestation.attester),
            "signature": attestation.signature,
            "data": format!("0x{}", hex::encode(&attestation.data)),
            "nonce": attestation.nonce,
        });

        let response = self
            .http
            .post(&url)
            .header("Authorization", token)
            .header("x-privy-app-id", &self.app_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RelayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        Ok(body.new_attestation_uid)
    }
}
