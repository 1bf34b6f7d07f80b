//! Error types for credential acquisition.

use crate::credential::FlowKind;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while acquiring a bearer token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The identity provider rejected the client id, secret or tenant.
    #[error("Client rejected by identity provider: {0}")]
    InvalidClient(String),

    /// The user aborted or denied the interactive sign-in.
    #[error("Sign-in cancelled by user")]
    UserCancelled,

    /// The identity provider requires an interactive step (consent, MFA, login).
    #[error("Interaction required: {0}")]
    InteractionRequired(String),

    /// The upstream token for an on-behalf-of exchange is missing, expired or rejected.
    #[error("Upstream token invalid: {0}")]
    UpstreamTokenInvalid(String),

    /// Transport failure talking to the identity provider.
    #[error("Network error: {0}")]
    NetworkFailure(String),

    /// A scope string could not be resolved to a single audience.
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// The authorization response did not carry the state we sent.
    #[error("State mismatch in authorization response")]
    StateMismatch,

    /// Any other OAuth error payload.
    #[error("Identity provider error ({status}): {error}: {description}")]
    IdentityProvider {
        status: u16,
        error: String,
        description: String,
    },

    /// A 2xx token response that is not a token.
    #[error("Malformed token response: {0}")]
    MalformedResponse(String),

    /// Invalid authority or redirect configuration.
    #[error("Config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::NetworkFailure(e.to_string())
    }
}

/// OAuth 2.0 error payload (RFC 6749 section 5.2).
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct OAuthErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}

impl AuthError {
    /// Map an identity provider rejection onto the typed error for `flow`.
    pub fn from_oauth(flow: FlowKind, status: u16, body: OAuthErrorBody) -> Self {
        let OAuthErrorBody {
            error,
            error_description,
        } = body;

        match (flow, error.as_str()) {
            (_, "invalid_client" | "unauthorized_client") => {
                AuthError::InvalidClient(error_description)
            }
            // AADSTS90002 (unknown tenant) and friends arrive as invalid_request.
            (FlowKind::Application, "invalid_request") => {
                AuthError::InvalidClient(error_description)
            }
            (_, "interaction_required" | "consent_required" | "login_required") => {
                AuthError::InteractionRequired(error_description)
            }
            (FlowKind::DelegatedExchange, "invalid_grant") => {
                AuthError::UpstreamTokenInvalid(error_description)
            }
            (FlowKind::Delegated, "access_denied") => AuthError::UserCancelled,
            (_, "") if status == 401 => AuthError::InvalidClient(format!("HTTP {}", status)),
            _ => AuthError::IdentityProvider {
                status,
                error,
                description: error_description,
            },
        }
    }
}
