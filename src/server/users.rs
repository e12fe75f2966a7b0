//! User profile and listing routes

use super::error::ApiError;
use super::{authenticate, AppState};
use crate::store::{NewUser, SortOrder, UserPage};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<EmailField>,
    pub wallet: WalletField,
}

/// The identity provider nests the address under `email.address`
#[derive(Debug, Deserialize)]
pub struct EmailField {
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WalletField {
    pub address: String,
}

/// POST /api/user — create the user for a verified session
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateUserBody>,
) -> Result<Json<Value>, ApiError> {
    let (claims, _) = authenticate(&state, &headers).await?;

    if state.store.get_user(&claims.user_id).await?.is_some() {
        return Err(ApiError::Validation(
            "user with this id already exists".into(),
        ));
    }

    let user = state
        .store
        .create_user(NewUser {
            id: claims.user_id,
            wallet: body.wallet.address,
            name: body.name,
            bio: body.bio,
            email: body.email.and_then(|e| e.address),
        })
        .await?;

    Ok(Json(json!({ "newUser": user })))
}

/// GET /api/user — own profile
pub async fn get_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let (claims, _) = authenticate(&state, &headers).await?;
    let user = state
        .store
        .get_user(&claims.user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(json!(user)))
}

#[derive(Debug, Deserialize)]
pub struct PatchUserBody {
    pub name: Option<String>,
    pub bio: Option<String>,
}

/// PATCH /api/user — update own name/bio.
///
/// A trimmed name of a single character is malformed; an empty name clears
/// the field.
pub async fn patch_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PatchUserBody>,
) -> Result<Json<Value>, ApiError> {
    let (claims, _) = authenticate(&state, &headers).await?;

    let name = match body.name {
        Some(raw) => {
            let trimmed = raw.trim().to_string();
            if !trimmed.is_empty() && trimmed.chars().count() < 2 {
                return Err(ApiError::Validation("invalid name".into()));
            }
            Some(trimmed)
        }
        None => None,
    };

    let user = state
        .store
        .update_profile(&claims.user_id, name, body.bio)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(json!(user)))
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    12
}

fn default_sort() -> SortOrder {
    SortOrder::Desc
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_sort", rename = "sortOrder")]
    pub sort_order: SortOrder,
    #[serde(default, rename = "searchQuery")]
    pub search_query: String,
}

/// GET /api/users — paged listing sorted by rank score
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<UserPage>, ApiError> {
    let search = (!query.search_query.is_empty()).then_some(query.search_query.as_str());
    let page = state
        .store
        .list_users(query.page, query.limit, query.sort_order, search)
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Serialize)]
pub struct WalletLookupResponse {
    pub id: String,
    pub zupass: Option<Value>,
}

/// GET /api/users/wallet/{address} — id plus first linked credential
pub async fn wallet_lookup(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<WalletLookupResponse>, ApiError> {
    let user = state
        .store
        .get_user_by_wallet(&address)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let zupass = state
        .store
        .credential_for_user(&user.id)
        .await?
        .map(|cred| json!({ "attestationUID": cred.attestation_uid }));

    Ok(Json(WalletLookupResponse { id: user.id, zupass }))
}
