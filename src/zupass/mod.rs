//! Ticket-credential linking
//!
//! A verified external ticket is bound to exactly one wallet. Before a
//! ticket-link attestation is issued, the deduplicator inspects previously
//! issued attestations for the ticket's nullifier:
//!
//! - a match on the caller's wallet means the credential is already
//!   correctly linked (idempotent success);
//! - a match on any other wallet refuses the link;
//! - no match lets the flow proceed to attest.
//!
//! The check and the later attestation are not atomic against a concurrent
//! link; the datastore's unique (nullifier, ticket_type) constraint is the
//! backstop.

pub mod pod;

pub use pod::{PodError, PodIssuer, PodSigner, SignedPod, StampPodIssuer};

use crate::attestation::index::{AttestationIndex, IndexError};
use alloy::primitives::{Address, B256};
use serde::Serialize;

/// Outcome of the duplicate-link check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheck {
    /// Some attestation already carries this (nullifier, ticket type)
    pub exists: bool,
    /// One of the matches was issued to the caller's wallet
    pub is_same_wallet: bool,
}

/// Check whether a (nullifier, ticket type) credential is already linked.
///
/// Wallet comparison is case-insensitive: both sides are parsed addresses.
pub async fn check_ticket_link(
    index: &dyn AttestationIndex,
    schema: B256,
    nullifier: &str,
    ticket_type: &str,
    wallet: Address,
) -> Result<LinkCheck, IndexError> {
    let records = index.ticket_links(schema, nullifier).await?;

    let matches: Vec<_> = records
        .iter()
        .filter(|r| r.ticket_type == ticket_type)
        .collect();

    let exists = !matches.is_empty();
    let is_same_wallet = matches.iter().any(|r| r.recipient == wallet);

    Ok(LinkCheck {
        exists,
        is_same_wallet,
    })
}
