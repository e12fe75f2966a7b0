//! Client-side vouch and ticket-link orchestration
//!
//! Drives the full delegated-attestation sequence: fetch nonce, build the
//! typed-data request, sign, submit. Nonces are fetched immediately before
//! use and incremented locally only within a single multi-ticket batch.
//!
//! None of these steps are retried: a signing rejection is user intent, and
//! a submission consumes quota, so a blind retry after an ambiguous failure
//! could double-spend.

use crate::attestation::claim::{derive_nullifier, ClaimData, ClaimError};
use crate::attestation::index::{AttestationIndex, IndexError};
use crate::attestation::relay::{AttestationRelay, DelegatedAttestation, NonceError, RelayError};
use crate::attestation::typed_data::{AttestRequest, AttestationDomain, SignError, WalletSigner};
use crate::attestation::{signature_to_hex, AttestationParams};
use crate::zupass::check_ticket_link;
use alloy::primitives::Address;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the vouch and ticket-link flows
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Nonce(#[from] NonceError),

    #[error(transparent)]
    Signing(#[from] SignError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// The credential is already linked to a different wallet
    #[error("ticket '{ticket_type}' is already claimed by another account")]
    AlreadyClaimed { ticket_type: String },
}

/// A verified ticket grant handed over by the credential verifier
#[derive(Debug, Clone)]
pub struct TicketGrant {
    pub ticket_type: String,
    pub group: String,
}

/// Outcome of linking one ticket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Already correctly linked to this wallet; nothing issued
    AlreadyLinked,
    /// Newly attested
    Linked { attestation_uid: String },
}

/// Issue a standard vouch from the signer's wallet to `recipient`.
///
/// Returns the new attestation UID. The relay enforces quota and rejects
/// self-vouches; this function only drives the signing sequence.
pub async fn vouch(
    relay: &dyn AttestationRelay,
    signer: &dyn WalletSigner,
    params: &AttestationParams,
    token: &str,
    recipient: Address,
) -> Result<String, FlowError> {
    let attester = signer.address();
    let nonce = relay.nonce(attester).await?;
    debug!(%attester, %recipient, nonce, "building vouch attestation");

    let request = AttestRequest {
        schema: params.schema,
        recipient,
        data: ClaimData::standard_vouch().encode()?,
        nonce,
    };

    let domain = AttestationDomain::new(params.chain_id, params.eas_contract);
    let signature = signer.sign_digest(request.eip712_digest(&domain)).await?;

    let uid = relay
        .submit(
            token,
            &DelegatedAttestation {
                schema: params.schema,
                recipient,
                attester,
                signature: signature_to_hex(&signature),
                data: request.data,
                nonce,
            },
        )
        .await?;

    info!(%attester, %recipient, uid, "vouch attested");
    Ok(uid)
}

/// Link a batch of verified tickets to the signer's wallet.
///
/// For each ticket: a duplicate check runs first. A match on this wallet is
/// an idempotent success; a match on another wallet aborts the whole batch.
/// Otherwise a ticket-link attestation is signed and submitted, and the
/// local nonce advances for the next ticket.
///
/// The check-then-attest pair is not atomic against a concurrent link of the
/// same credential; the datastore's unique credential index is the backstop.
pub async fn link_tickets(
    relay: &dyn AttestationRelay,
    signer: &dyn WalletSigner,
    index: &dyn AttestationIndex,
    params: &AttestationParams,
    token: &str,
    external_id: &str,
    tickets: &[TicketGrant],
) -> Result<Vec<LinkOutcome>, FlowError> {
    let attester = signer.address();
    let nullifier = derive_nullifier(external_id);
    let domain = AttestationDomain::new(params.chain_id, params.eas_contract);

    let mut nonce = relay.nonce(attester).await?;
    let mut outcomes = Vec::with_capacity(tickets.len());

    for ticket in tickets {
        let check = check_ticket_link(
            index,
            params.zupass_schema,
            &nullifier,
            &ticket.ticket_type,
            attester,
        )
        .await?;

        if check.exists {
            if check.is_same_wallet {
                debug!(ticket_type = %ticket.ticket_type, "ticket already linked to this wallet");
                outcomes.push(LinkOutcome::AlreadyLinked);
                continue;
            }
            return Err(FlowError::AlreadyClaimed {
                ticket_type: ticket.ticket_type.clone(),
            });
        }

        let claim = ClaimData::TicketLink {
            nullifier: nullifier.clone(),
            ticket_type: ticket.ticket_type.clone(),
            issuer: ticket.group.clone(),
        };

        let request = AttestRequest {
            schema: params.zupass_schema,
            recipient: attester, // ticket links are self-attestations
            data: claim.encode()?,
            nonce,
        };

        let signature = signer.sign_digest(request.eip712_digest(&domain)).await?;
        let uid = relay
            .submit(
                token,
                &DelegatedAttestation {
                    schema: params.zupass_schema,
                    recipient: attester,
                    attester,
                    signature: signature_to_hex(&signature),
                    data: request.data,
                    nonce,
                },
            )
            .await?;

        info!(ticket_type = %ticket.ticket_type, uid, "ticket linked");
        outcomes.push(LinkOutcome::Linked {
            attestation_uid: uid,
        });
        nonce += 1;
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::claim::decode_ticket_link;
    use crate::attestation::index::TicketLinkRecord;
    use crate::attestation::mock::{MockIndex, MockRelay, MockWalletSigner};
    use crate::attestation::typed_data::EAS_CONTRACT;
    use alloy::primitives::B256;

    fn params() -> AttestationParams {
        AttestationParams {
            chain_id: 84532,
            eas_contract: EAS_CONTRACT.parse().unwrap(),
            schema: B256::repeat_byte(0x11),
            zupass_schema: B256::repeat_byte(0x22),
        }
    }

    fn recipient() -> Address {
        "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB".parse().unwrap()
    }

    #[tokio::test]
    async fn vouch_submits_signed_attestation() {
        let relay = MockRelay::new();
        let signer = MockWalletSigner::new();

        let uid = vouch(&relay, &signer, &params(), "token", recipient())
            .await
            .unwrap();

        assert!(uid.starts_with("0xmock"));
        let submissions = relay.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].recipient, recipient());
        assert_eq!(submissions[0].attester, signer.address());
        assert_eq!(submissions[0].nonce, 0);
    }

    #[tokio::test]
    async fn rejection_aborts_without_submission() {
        let relay = MockRelay::new();
        let signer = MockWalletSigner::rejecting();

        let err = vouch(&relay, &signer, &params(), "token", recipient())
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::Signing(SignError::Rejected)));
        assert!(relay.submissions().is_empty());
    }

    #[tokio::test]
    async fn nonce_failure_aborts_flow() {
        let relay = MockRelay::new();
        relay.fail_nonce();
        let signer = MockWalletSigner::new();

        let err = vouch(&relay, &signer, &params(), "token", recipient())
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::Nonce(_)));
        assert!(relay.submissions().is_empty());
    }

    #[tokio::test]
    async fn link_tickets_attests_fresh_credentials() {
        let relay = MockRelay::new();
        let signer = MockWalletSigner::new();
        let index = MockIndex::new();

        let tickets = vec![
            TicketGrant {
                ticket_type: "GA".into(),
                group: "Devconnect".into(),
            },
            TicketGrant {
                ticket_type: "Speaker".into(),
                group: "Devconnect".into(),
            },
        ];

        let outcomes = link_tickets(
            &relay,
            &signer,
            &index,
            &params(),
            "token",
            "ticket-id-1",
            &tickets,
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, LinkOutcome::Linked { .. })));

        // The second submission advanced the nonce locally
        let submissions = relay.submissions();
        assert_eq!(submissions[0].nonce, 0);
        assert_eq!(submissions[1].nonce, 1);

        // Both payloads decode to the ticket-link schema with the nullifier
        let fields = decode_ticket_link(&submissions[0].data).unwrap();
        assert_eq!(fields.nullifier, derive_nullifier("ticket-id-1"));
        assert_eq!(fields.subcategory, "GA");
    }

    #[tokio::test]
    async fn same_wallet_link_is_idempotent() {
        let relay = MockRelay::new();
        let signer = MockWalletSigner::new();
        let index = MockIndex::with_records(vec![TicketLinkRecord {
            uid: "0xexisting".into(),
            recipient: signer.address(),
            ticket_type: "GA".into(),
        }]);

        let outcomes = link_tickets(
            &relay,
            &signer,
            &index,
            &params(),
            "token",
            "ticket-id-1",
            &[TicketGrant {
                ticket_type: "GA".into(),
                group: "Devconnect".into(),
            }],
        )
        .await
        .unwrap();

        assert_eq!(outcomes, vec![LinkOutcome::AlreadyLinked]);
        assert!(relay.submissions().is_empty());
    }

    #[tokio::test]
    async fn foreign_wallet_link_is_refused() {
        let relay = MockRelay::new();
        let signer = MockWalletSigner::new();
        let other: Address = "0xCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC".parse().unwrap();
        let index = MockIndex::with_records(vec![TicketLinkRecord {
            uid: "0xexisting".into(),
            recipient: other,
            ticket_type: "GA".into(),
        }]);

        let err = link_tickets(
            &relay,
            &signer,
            &index,
            &params(),
            "token",
            "ticket-id-1",
            &[TicketGrant {
                ticket_type: "GA".into(),
                group: "Devconnect".into(),
            }],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, FlowError::AlreadyClaimed { .. }));
        assert!(relay.submissions().is_empty());
    }
}
