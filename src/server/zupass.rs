//! Ticket-credential routes: dedup check, save, POD signing and issuance

use super::error::ApiError;
use super::{authenticate, AppState};
use crate::store::LinkedCredential;
use crate::zupass::{check_ticket_link, LinkCheck};
use alloy::primitives::Address;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct CheckSemaphoreBody {
    /// Ticket nullifier (keccak256 of the external ticket id)
    #[serde(rename = "semaphoreId")]
    pub semaphore_id: String,
    #[serde(rename = "ticketType")]
    pub ticket_type: String,
}

/// POST /api/zupass/checkSemaphore
///
/// Duplicate-link check against the attestation index. On the first
/// same-wallet match the credential row is persisted locally so later
/// profile reads see the link without another index round trip.
pub async fn check_semaphore(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CheckSemaphoreBody>,
) -> Result<Json<LinkCheck>, ApiError> {
    let (claims, _) = authenticate(&state, &headers).await?;

    let user = state
        .store
        .get_user(&claims.user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    let wallet: Address = user.wallet.parse().map_err(|_| ApiError::Internal)?;

    let records = state
        .index
        .ticket_links(state.params.zupass_schema, &body.semaphore_id)
        .await
        .map_err(|e| {
            warn!(error = %e, "attestation index query failed");
            ApiError::Internal
        })?;

    // Re-run the policy over the fetched records so the matching UID is at
    // hand for persistence.
    let check = check_ticket_link_records(&records, &body.ticket_type, wallet);

    if check.exists && check.is_same_wallet {
        if let Some(record) = records
            .iter()
            .find(|r| r.ticket_type == body.ticket_type && r.recipient == wallet)
        {
            let inserted = state
                .store
                .link_credential(&LinkedCredential {
                    attestation_uid: record.uid.clone(),
                    user_id: user.id.clone(),
                    nullifier: body.semaphore_id.clone(),
                    ticket_type: body.ticket_type.clone(),
                    issuer: None,
                    category: Some("Community".into()),
                    subcategory: Some(body.ticket_type.clone()),
                    platform: Some("Zupass".into()),
                })
                .await?;
            if inserted {
                info!(user = %user.id, uid = %record.uid, "linked credential persisted");
            }
        }
    }

    Ok(Json(check))
}

fn check_ticket_link_records(
    records: &[crate::attestation::TicketLinkRecord],
    ticket_type: &str,
    wallet: Address,
) -> LinkCheck {
    let matches: Vec<_> = records
        .iter()
        .filter(|r| r.ticket_type == ticket_type)
        .collect();
    LinkCheck {
        exists: !matches.is_empty(),
        is_same_wallet: matches.iter().any(|r| r.recipient == wallet),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCredentialBody {
    pub attestation_uid: String,
    pub nullifier: String,
    pub ticket_type: String,
    pub issuer: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub platform: Option<String>,
}

/// POST /api/zupass/save — upsert the caller's credential row
pub async fn save(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SaveCredentialBody>,
) -> Result<Json<Value>, ApiError> {
    let (claims, _) = authenticate(&state, &headers).await?;

    let credential = LinkedCredential {
        attestation_uid: body.attestation_uid,
        user_id: claims.user_id,
        nullifier: body.nullifier,
        ticket_type: body.ticket_type,
        issuer: body.issuer,
        category: body.category,
        subcategory: body.subcategory,
        platform: body.platform,
    };

    state.store.upsert_credential(&credential).await?;
    Ok(Json(json!({ "success": true, "data": credential })))
}

#[derive(Debug, Deserialize)]
pub struct SignPodBody {
    pub timestamp: u64,
}

/// POST /api/zupass/sign-pod
///
/// Issues the signed derived credential, or returns the URL cached on the
/// user row. Fails closed with a 500 when the signing key is not
/// configured.
pub async fn sign_pod(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SignPodBody>,
) -> Result<Json<Value>, ApiError> {
    let (claims, _) = authenticate(&state, &headers).await?;

    let user = state
        .store
        .get_user(&claims.user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    if let Some(url) = user.agorapass_url {
        return Ok(Json(json!({ "url": url, "cached": true })));
    }

    let signer = state.pod_signer.as_ref().ok_or_else(|| {
        warn!("sign-pod requested but no signing key is configured");
        ApiError::Internal
    })?;

    let pod = signer.sign(&user.wallet, body.timestamp)?;
    let url = pod.url();
    state.store.set_agorapass_url(&user.id, &url).await?;

    Ok(Json(json!({ "podpcd": pod, "url": url, "cached": false })))
}

/// POST /api/zupass/pod/create — proxy to the credential-issuance service,
/// forwarding the bearer token and the user's score
pub async fn pod_create(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let (claims, token) = authenticate(&state, &headers).await?;

    let user = state
        .store
        .get_user(&claims.user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let pod = state
        .pod_issuer
        .create_pod(&token, &user.wallet, user.rank_score)
        .await?;

    Ok(Json(pod))
}
