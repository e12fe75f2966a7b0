//! API error taxonomy
//!
//! - Auth failures are 401 and require re-authentication.
//! - Validation failures are 400, surfaced verbatim.
//! - Quota exhaustion is the distinguished 550 status kept for existing
//!   clients that match on it.
//! - External-service failures are logged with detail and surfaced as a
//!   generic 500; retry is manual, never automatic.

use crate::attestation::relay::RelayError;
use crate::identity::IdentityError;
use crate::store::StoreError;
use crate::zupass::PodError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the route handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authorization header missing or invalid")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("you have no vouches available")]
    QuotaExhausted,

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// Non-standard quota status, preserved for client compatibility
    fn quota_status() -> StatusCode {
        StatusCode::from_u16(550).expect("550 is within the valid status range")
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::QuotaExhausted => Self::quota_status(),
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => ApiError::Validation(message),
            StoreError::Database(e) => {
                error!(error = %e, "datastore failure");
                ApiError::Internal
            }
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidToken => ApiError::Unauthorized,
            IdentityError::Transport(e) => {
                error!(error = %e, "identity provider failure");
                ApiError::Internal
            }
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        error!(error = %err, "attestation relay failure");
        ApiError::Internal
    }
}

impl From<PodError> for ApiError {
    fn from(err: PodError) -> Self {
        error!(error = %err, "credential issuance failure");
        ApiError::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_status_is_550() {
        assert_eq!(ApiError::QuotaExhausted.status().as_u16(), 550);
    }

    #[test]
    fn conflict_maps_to_validation() {
        let api: ApiError = StoreError::Conflict("duplicate".into()).into();
        assert!(matches!(api, ApiError::Validation(_)));
    }

    #[test]
    fn invalid_token_maps_to_unauthorized() {
        let api: ApiError = IdentityError::InvalidToken.into();
        assert!(matches!(api, ApiError::Unauthorized));
    }
}
