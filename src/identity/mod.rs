//! Identity provider seam
//!
//! Every mutating route requires a bearer token from the embedded-wallet
//! identity provider. Verification yields the opaque `user_id` claim used as
//! the datastore primary key. The provider is external; only the
//! verification call is modeled here.

pub mod mock;
pub mod privy;

pub use mock::MockIdentityProvider;
pub use privy::PrivyIdentity;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from token verification
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The token is missing, malformed, or expired. The user must
    /// re-authenticate; never retried.
    #[error("token verification failed")]
    InvalidToken,

    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

/// Claims extracted from a verified session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthClaims {
    /// Opaque user id, primary key in the datastore
    pub user_id: String,
}

/// Verification seam over the identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer token and return its claims
    async fn verify_token(&self, token: &str) -> Result<AuthClaims, IdentityError>;
}
