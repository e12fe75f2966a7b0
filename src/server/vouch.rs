//! Vouch issuance route
//!
//! The quota is consumed by an atomic decrement-if-positive before the relay
//! call and restored if the relay fails, so concurrent requests can never
//! push the counter below zero or over-issue.

use super::error::ApiError;
use super::{authenticate, AppState};
use crate::attestation::relay::DelegatedAttestation;
use crate::attestation::ClaimData;
use alloy::primitives::Address;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct CreateAttestationBody {
    pub recipient: String,
    pub attester: String,
    /// Flat 65-byte hex signature produced by the wallet
    pub signature: String,
    pub nonce: u64,
    pub claim: ClaimData,
}

/// POST /api/createAttestation
pub async fn create_attestation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateAttestationBody>,
) -> Result<Json<Value>, ApiError> {
    let (claims, token) = authenticate(&state, &headers).await?;

    let user = state
        .store
        .get_user(&claims.user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let recipient: Address = body
        .recipient
        .parse()
        .map_err(|_| ApiError::Validation("invalid recipient address".into()))?;
    let attester: Address = body
        .attester
        .parse()
        .map_err(|_| ApiError::Validation("invalid attester address".into()))?;

    if recipient == attester {
        return Err(ApiError::Validation("you can't vouch yourself".into()));
    }

    // The attester must be the session's own wallet; the signature is
    // otherwise relayed on behalf of someone else.
    let session_wallet: Address = user
        .wallet
        .parse()
        .map_err(|_| ApiError::Internal)?;
    if attester != session_wallet {
        return Err(ApiError::Validation(
            "attester does not match the session wallet".into(),
        ));
    }

    let data = body
        .claim
        .encode()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let schema = match body.claim {
        ClaimData::StandardVouch {} => state.params.schema,
        ClaimData::TicketLink { .. } => state.params.zupass_schema,
    };

    // Reserve quota first; a failed relay submission gives it back.
    if !state.store.consume_vouch(&user.id).await? {
        return Err(ApiError::QuotaExhausted);
    }

    let attestation = DelegatedAttestation {
        schema,
        recipient,
        attester,
        signature: body.signature,
        data,
        nonce: body.nonce,
    };

    let uid = match state.relay.submit(&token, &attestation).await {
        Ok(uid) => uid,
        Err(e) => {
            if let Err(restore_err) = state.store.restore_vouch(&user.id).await {
                error!(error = %restore_err, user = %user.id, "failed to restore vouch after relay error");
            }
            return Err(e.into());
        }
    };

    info!(%attester, %recipient, uid, "attestation created");
    Ok(Json(json!({ "newAttestationUID": uid })))
}
