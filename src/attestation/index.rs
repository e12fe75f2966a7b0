//! Attestation index queries
//!
//! Read-side lookups against the attestation network's indexer, used by the
//! ticket-link deduplicator to find previously issued ticket-linking
//! attestations for a nullifier. Eventually consistent with on-chain state.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors from index queries
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index query failed: {0}")]
    Query(String),

    #[error("index transport error: {0}")]
    Transport(String),
}

/// A previously issued ticket-linking attestation
#[derive(Debug, Clone)]
pub struct TicketLinkRecord {
    /// Attestation UID on the network
    pub uid: String,
    /// Wallet the credential was linked to
    pub recipient: Address,
    /// Decoded ticket type from the claim payload
    pub ticket_type: String,
}

/// Index seam for duplicate-link detection
#[async_trait]
pub trait AttestationIndex: Send + Sync {
    /// All ticket-link attestations under `schema` carrying `nullifier`
    async fn ticket_links(
        &self,
        schema: B256,
        nullifier: &str,
    ) -> Result<Vec<TicketLinkRecord>, IndexError>;
}

const TICKET_LINKS_QUERY: &str = r#"
query TicketLinks($schemaId: String!, $nullifier: String!) {
  attestations(where: {
    schemaId: { equals: $schemaId },
    revoked: { equals: false },
    decodedDataJson: { contains: $nullifier }
  }) {
    id
    recipient
    decodedDataJson
  }
}
"#;

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<AttestationsData>,
    errors: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct AttestationsData {
    attestations: Vec<RawAttestation>,
}

#[derive(Deserialize)]
struct RawAttestation {
    id: String,
    recipient: String,
    #[serde(rename = "decodedDataJson")]
    decoded_data_json: String,
}

/// GraphQL indexer client (easscan-style endpoint)
#[derive(Clone)]
pub struct EasScanIndex {
    http: reqwest::Client,
    endpoint: String,
}

impl EasScanIndex {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AttestationIndex for EasScanIndex {
    async fn ticket_links(
        &self,
        schema: B256,
        nullifier: &str,
    ) -> Result<Vec<TicketLinkRecord>, IndexError> {
        let body = json!({
            "query": TICKET_LINKS_QUERY,
            "variables": {
                "schemaId": format!("{:#x}", schema),
                "nullifier": nullifier,
            },
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| IndexError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IndexError::Query(format!("status {}", response.status())));
        }

        let parsed: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| IndexError::Transport(e.to_string()))?;

        if let Some(errors) = parsed.errors {
            return Err(IndexError::Query(errors.to_string()));
        }

        let attestations = parsed
            .data
            .map(|d| d.attestations)
            .unwrap_or_default();

        let mut records = Vec::with_capacity(attestations.len());
        for raw in attestations {
            let recipient: Address = raw
                .recipient
                .parse()
                .map_err(|_| IndexError::Query(format!("bad recipient '{}'", raw.recipient)))?;

            // The indexer stores the decoded claim as a JSON document; only
            // the ticket type matters for deduplication.
            let decoded: serde_json::Value = serde_json::from_str(&raw.decoded_data_json)
                .map_err(|e| IndexError::Query(e.to_string()))?;
            let ticket_type = decoded
                .get("ticketType")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            records.push(TicketLinkRecord {
                uid: raw.id,
                recipient,
                ticket_type,
            });
        }

        Ok(records)
    }
}
