//! Remaining-quota read route

use super::error::ApiError;
use super::AppState;
use crate::season::remaining_vouches;
use alloy::primitives::Address;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

/// GET /api/season/remaining/{address}
///
/// `remaining` is null when any contract read fails; clients must render
/// that as unavailable, never as zero.
pub async fn remaining(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let address: Address = address
        .parse()
        .map_err(|_| ApiError::Validation("invalid address".into()))?;

    let remaining = remaining_vouches(state.season.as_ref(), address).await;
    Ok(Json(json!({ "remaining": remaining })))
}
