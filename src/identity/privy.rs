//! HTTP verification client for the embedded-wallet identity provider

use super::{AuthClaims, IdentityError, IdentityProvider};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(rename = "userId")]
    user_id: String,
}

/// Privy-style token verification over HTTP
#[derive(Clone)]
pub struct PrivyIdentity {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
}

impl PrivyIdentity {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for PrivyIdentity {
    async fn verify_token(&self, token: &str) -> Result<AuthClaims, IdentityError> {
        let url = format!("{}/sessions/verify", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("x-privy-app-id", &self.app_id)
            .json(&json!({ "token": token }))
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::InvalidToken);
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        Ok(AuthClaims {
            user_id: body.user_id,
        })
    }
}
