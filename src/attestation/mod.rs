//! Delegated attestation flow
//!
//! Everything needed to issue an EAS-style delegated attestation:
//! claim encoding, EIP-712 typed data, nonce fetching, relay submission,
//! and index lookups for deduplication. External services sit behind trait
//! seams with in-memory mocks.

pub mod claim;
pub mod flow;
pub mod index;
pub mod mock;
pub mod relay;
pub mod typed_data;

pub use claim::{derive_nullifier, ClaimData, ClaimError};
pub use flow::{link_tickets, vouch, FlowError, LinkOutcome, TicketGrant};
pub use index::{AttestationIndex, IndexError, TicketLinkRecord};
pub use relay::{AttestationRelay, DelegatedAttestation, NonceError, RelayError};
pub use typed_data::{
    signature_to_hex, AttestRequest, AttestationDomain, LocalWalletSigner, SignError, WalletSigner,
};

use alloy::primitives::{Address, B256};

/// Chain and schema parameters shared by the attestation flows
#[derive(Debug, Clone, Copy)]
pub struct AttestationParams {
    pub chain_id: u64,
    /// EAS contract the typed data is bound to
    pub eas_contract: Address,
    /// Schema UID for standard vouches
    pub schema: B256,
    /// Schema UID for ticket-link attestations
    pub zupass_schema: B256,
}
