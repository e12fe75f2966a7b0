//! Claim encoding for vouch and ticket-link attestations
//!
//! Attestation payloads are ABI-encoded against one of two fixed schemas:
//!
//! - **Standard vouch**: `(bytes32 endorsement, bytes32 platform, bytes32 category)`
//!   with the fixed values Social / AgoraPass / Community.
//! - **Ticket link**: `(string nullifier, bytes32 category, bytes32 subcategory,
//!   bytes32[] subsubcategory, bytes32 issuer, bytes32 credentialType,
//!   bytes32 platform)` binding an external ticket credential to a wallet.
//!
//! Claims arriving over the API boundary are a tagged enum, rejected when the
//! shape is unrecognized. String fields are encoded as bytes32: UTF-8 bytes
//! right-padded with zeros, at most 31 bytes.

use alloy::primitives::{keccak256, FixedBytes};
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Endorsement value for every standard vouch
pub const ENDORSEMENT_SOCIAL: &str = "Social";
/// Platform value for every standard vouch
pub const PLATFORM_AGORAPASS: &str = "AgoraPass";
/// Category value shared by both claim kinds
pub const CATEGORY_COMMUNITY: &str = "Community";
/// Credential type for ticket-link claims
pub const CREDENTIAL_TYPE_TICKET: &str = "Ticket";
/// Platform value for ticket-link claims
pub const PLATFORM_ZUPASS: &str = "Zupass";
/// Fixed sub-subcategory entry for ticket-link claims
pub const SUBSUBCATEGORY_SHORT: &str = "short";

/// Errors from claim encoding/decoding
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("string does not fit in bytes32: '{0}' exceeds 31 bytes")]
    StringTooLong(String),

    #[error("bytes32 field is not valid UTF-8")]
    InvalidUtf8,

    #[error("claim payload does not match schema: {0}")]
    SchemaMismatch(String),
}

/// An attestation claim, validated at the API boundary.
///
/// Unrecognized shapes fail serde deserialization with a 400 rather than
/// being passed through untyped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ClaimData {
    /// A community vouch with the three fixed fields
    StandardVouch {},

    /// A ticket credential bound to the attester's wallet
    #[serde(rename_all = "camelCase")]
    TicketLink {
        /// One-way identifier derived from the external ticket id
        nullifier: String,
        /// Ticket type within the issuing event
        ticket_type: String,
        /// Issuing group name
        issuer: String,
    },
}

impl ClaimData {
    /// The standard vouch claim (all fields are fixed values)
    pub fn standard_vouch() -> Self {
        ClaimData::StandardVouch {}
    }

    /// ABI-encode this claim for the attestation payload
    pub fn encode(&self) -> Result<Vec<u8>, ClaimError> {
        match self {
            ClaimData::StandardVouch {} => {
                let tuple = (
                    encode_bytes32_string(ENDORSEMENT_SOCIAL)?,
                    encode_bytes32_string(PLATFORM_AGORAPASS)?,
                    encode_bytes32_string(CATEGORY_COMMUNITY)?,
                );
                Ok(tuple.abi_encode_params())
            }
            ClaimData::TicketLink {
                nullifier,
                ticket_type,
                issuer,
            } => {
                let tuple = (
                    nullifier.clone(),
                    encode_bytes32_string(CATEGORY_COMMUNITY)?,
                    encode_bytes32_string(ticket_type)?,
                    vec![encode_bytes32_string(SUBSUBCATEGORY_SHORT)?],
                    encode_bytes32_string(issuer)?,
                    encode_bytes32_string(CREDENTIAL_TYPE_TICKET)?,
                    encode_bytes32_string(PLATFORM_ZUPASS)?,
                );
                Ok(tuple.abi_encode_params())
            }
        }
    }
}

/// Decoded standard vouch fields, recovered from a stored payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VouchFields {
    pub endorsement: String,
    pub platform: String,
    pub category: String,
}

/// Decode a standard vouch payload back into its three string fields
pub fn decode_vouch(data: &[u8]) -> Result<VouchFields, ClaimError> {
    let (endorsement, platform, category) =
        <(FixedBytes<32>, FixedBytes<32>, FixedBytes<32>)>::abi_decode_params(data)
            .map_err(|e| ClaimError::SchemaMismatch(e.to_string()))?;

    Ok(VouchFields {
        endorsement: decode_bytes32_string(&endorsement)?,
        platform: decode_bytes32_string(&platform)?,
        category: decode_bytes32_string(&category)?,
    })
}

/// Decoded ticket-link fields, recovered from a stored payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketLinkFields {
    pub nullifier: String,
    pub category: String,
    pub subcategory: String,
    pub issuer: String,
    pub credential_type: String,
    pub platform: String,
}

/// Decode a ticket-link payload back into its string fields
pub fn decode_ticket_link(data: &[u8]) -> Result<TicketLinkFields, ClaimError> {
    type TicketTuple = (
        String,
        FixedBytes<32>,
        FixedBytes<32>,
        Vec<FixedBytes<32>>,
        FixedBytes<32>,
        FixedBytes<32>,
        FixedBytes<32>,
    );

    let (nullifier, category, subcategory, _subsub, issuer, credential_type, platform) =
        TicketTuple::abi_decode_params(data)
            .map_err(|e| ClaimError::SchemaMismatch(e.to_string()))?;

    Ok(TicketLinkFields {
        nullifier,
        category: decode_bytes32_string(&category)?,
        subcategory: decode_bytes32_string(&subcategory)?,
        issuer: decode_bytes32_string(&issuer)?,
        credential_type: decode_bytes32_string(&credential_type)?,
        platform: decode_bytes32_string(&platform)?,
    })
}

/// Derive a ticket nullifier from the external ticket id.
///
/// One-way: the external id never leaves the client, only its keccak256
/// hash is attested. Rendered 0x-prefixed lowercase hex.
pub fn derive_nullifier(external_id: &str) -> String {
    format!("{:#x}", keccak256(external_id.as_bytes()))
}

/// Encode a UTF-8 string into a bytes32 word, right-padded with zeros.
///
/// Errors if the encoded form exceeds 31 bytes (one byte is reserved so a
/// zero terminator always survives, matching the EAS string convention).
pub fn encode_bytes32_string(s: &str) -> Result<FixedBytes<32>, ClaimError> {
    let bytes = s.as_bytes();
    if bytes.len() > 31 {
        return Err(ClaimError::StringTooLong(s.to_string()));
    }
    let mut word = [0u8; 32];
    word[..bytes.len()].copy_from_slice(bytes);
    Ok(FixedBytes::from(word))
}

/// Decode a bytes32 word back into a string, trimming trailing zeros
pub fn decode_bytes32_string(word: &FixedBytes<32>) -> Result<String, ClaimError> {
    let end = word
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(word.len());
    std::str::from_utf8(&word[..end])
        .map(str::to_owned)
        .map_err(|_| ClaimError::InvalidUtf8)
}
