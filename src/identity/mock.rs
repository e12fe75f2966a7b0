//! Mock identity provider for tests

use super::{AuthClaims, IdentityError, IdentityProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory identity provider: a token-to-user table
#[derive(Default)]
pub struct MockIdentityProvider {
    sessions: Mutex<HashMap<String, String>>,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a valid session token for a user id
    pub fn grant(&self, token: impl Into<String>, user_id: impl Into<String>) {
        self.sessions
            .lock()
            .expect("mock lock poisoned")
            .insert(token.into(), user_id.into());
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<AuthClaims, IdentityError> {
        self.sessions
            .lock()
            .expect("mock lock poisoned")
            .get(token)
            .map(|user_id| AuthClaims {
                user_id: user_id.clone(),
            })
            .ok_or(IdentityError::InvalidToken)
    }
}
