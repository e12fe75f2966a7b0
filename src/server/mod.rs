//! REST API surface
//!
//! Route handlers are thin: verify the session, validate the body, call the
//! store and the external-service clients, map errors through
//! [`error::ApiError`]. All clients are injected through [`AppState`]
//! rather than held as ambient singletons; each handler runs one request to
//! completion with no shared mutable state beyond the pool.

pub mod error;
pub mod season;
pub mod users;
pub mod vouch;
pub mod zupass;

use crate::attestation::{AttestationIndex, AttestationParams, AttestationRelay};
use crate::identity::{AuthClaims, IdentityProvider};
use crate::season::SeasonContract;
use crate::store::Store;
use crate::zupass::{PodIssuer, PodSigner};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use error::ApiError;
use std::sync::Arc;

/// Shared state for the route handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub identity: Arc<dyn IdentityProvider>,
    pub relay: Arc<dyn AttestationRelay>,
    pub index: Arc<dyn AttestationIndex>,
    pub season: Arc<dyn SeasonContract>,
    pub pod_issuer: Arc<dyn PodIssuer>,
    /// Absent when the signing key is not configured; sign-pod then fails
    /// closed with a 500 instead of issuing unsigned credentials.
    pub pod_signer: Option<Arc<PodSigner>>,
    pub params: AttestationParams,
}

/// Build the API router over the injected state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/user", post(users::create_user).get(users::get_me).patch(users::patch_user))
        .route("/api/users", get(users::list_users))
        .route("/api/users/wallet/{address}", get(users::wallet_lookup))
        .route("/api/createAttestation", post(vouch::create_attestation))
        .route("/api/season/remaining/{address}", get(season::remaining))
        .route("/api/zupass/checkSemaphore", post(zupass::check_semaphore))
        .route("/api/zupass/save", post(zupass::save))
        .route("/api/zupass/sign-pod", post(zupass::sign_pod))
        .route("/api/zupass/pod/create", post(zupass::pod_create))
        .with_state(state)
}

/// Raw bearer token from the Authorization header.
///
/// The original clients send the token bare; a `Bearer ` prefix is also
/// accepted.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Verify the session token and return its claims
pub(crate) async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(AuthClaims, String), ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    let claims = state.identity.verify_token(token).await?;
    Ok((claims, token.to_string()))
}
