//! The identity provider's token and authorization endpoints.

use serde::Deserialize;
use url::Url;

use crate::credential::FlowKind;
use crate::error::{AuthError, OAuthErrorBody, Result};
use crate::scope::Audience;
use crate::token::BearerToken;

/// Public Entra ID authority.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Successful token response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Token endpoint client for one authority.
///
/// Holds no per-user state; one instance can serve any number of flows.
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    http: reqwest::Client,
    authority: Url,
}

impl TokenEndpoint {
    /// Create an endpoint for `authority` (e.g. [`DEFAULT_AUTHORITY`]).
    pub fn new(authority: &str) -> Result<Self> {
        Self::with_client(authority, reqwest::Client::new())
    }

    pub fn with_client(authority: &str, http: reqwest::Client) -> Result<Self> {
        let mut authority = Url::parse(authority)
            .map_err(|e| AuthError::Config(format!("invalid authority '{}': {}", authority, e)))?;
        if !authority.path().ends_with('/') {
            authority.set_path(&format!("{}/", authority.path()));
        }
        Ok(Self { http, authority })
    }

    pub fn authority(&self) -> &Url {
        &self.authority
    }

    /// `{authority}/{tenant}/oauth2/v2.0/token`
    pub fn token_url(&self, tenant_id: &str) -> Result<Url> {
        self.tenant_url(tenant_id, "token")
    }

    /// `{authority}/{tenant}/oauth2/v2.0/authorize`
    pub fn authorize_url(&self, tenant_id: &str) -> Result<Url> {
        self.tenant_url(tenant_id, "authorize")
    }

    fn tenant_url(&self, tenant_id: &str, leaf: &str) -> Result<Url> {
        let tenant_id = tenant_id.trim_matches('/');
        if tenant_id.is_empty() {
            return Err(AuthError::Config("tenant id is empty".to_string()));
        }
        self.authority
            .join(&format!("{}/oauth2/v2.0/{}", tenant_id, leaf))
            .map_err(|e| AuthError::Config(format!("invalid tenant '{}': {}", tenant_id, e)))
    }

    /// POST a grant to the tenant's token endpoint and bind the result to `audience`.
    pub async fn request_token(
        &self,
        flow: FlowKind,
        tenant_id: &str,
        form: &[(&str, &str)],
        audience: Audience,
    ) -> Result<BearerToken> {
        let url = self.token_url(tenant_id)?;
        tracing::debug!(flow = ?flow, tenant = tenant_id, audience = %audience, "requesting token");

        let response = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::NetworkFailure(format!("Token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::NetworkFailure(format!("Token response unreadable: {}", e)))?;

        if !status.is_success() {
            let payload: OAuthErrorBody = serde_json::from_str(&body).unwrap_or_default();
            tracing::warn!(
                flow = ?flow,
                status = status.as_u16(),
                error = %payload.error,
                "token request rejected"
            );
            return Err(AuthError::from_oauth(flow, status.as_u16(), payload));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        if !token.token_type.is_empty() && !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::MalformedResponse(format!(
                "unexpected token type '{}'",
                token.token_type
            )));
        }

        let expires_in = token.expires_in;
        if expires_in < 0 {
            return Err(AuthError::MalformedResponse(format!(
                "negative expires_in {}",
                expires_in
            )));
        }

        tracing::debug!(flow = ?flow, audience = %audience, expires_in, "token acquired");
        BearerToken::try_expiring_in(token.access_token, expires_in, audience).ok_or_else(|| {
            AuthError::MalformedResponse(format!("expires_in {} is out of range", expires_in))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_url() {
        let endpoint = TokenEndpoint::new(DEFAULT_AUTHORITY).unwrap();
        assert_eq!(
            endpoint.token_url("contoso").unwrap().as_str(),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
        assert_eq!(
            endpoint.authorize_url("contoso").unwrap().as_str(),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/authorize"
        );
    }

    #[test]
    fn test_authority_with_path_prefix() {
        let endpoint = TokenEndpoint::new("http://127.0.0.1:9000/idp").unwrap();
        assert_eq!(
            endpoint.token_url("t1").unwrap().as_str(),
            "http://127.0.0.1:9000/idp/t1/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_empty_tenant_rejected() {
        let endpoint = TokenEndpoint::new(DEFAULT_AUTHORITY).unwrap();
        assert!(matches!(endpoint.token_url(""), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_invalid_authority() {
        assert!(TokenEndpoint::new("not a url").is_err());
    }
}
