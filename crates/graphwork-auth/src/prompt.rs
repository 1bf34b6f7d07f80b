//! The interactive sign-in seam.
//!
//! The delegated flow needs a human to sign in. How that happens (browser,
//! pasted redirect, embedded webview) is up to the [`InteractivePrompt`]
//! implementation; this crate only builds the request and redeems the code.

use async_trait::async_trait;

/// What the prompt must show the user.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Fully built authorization URL, including PKCE challenge and state.
    pub url: String,
    /// Redirect URI registered for the client.
    pub redirect_uri: String,
    /// State the response must echo back.
    pub state: String,
}

/// The authorization code returned on the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub state: String,
}

/// Why the prompt could not produce a code.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// The user closed the prompt or gave no input.
    #[error("sign-in cancelled")]
    Cancelled,

    /// The identity provider redirected back with an OAuth error.
    #[error("{error}: {description}")]
    Denied { error: String, description: String },

    /// The prompt itself failed.
    #[error("prompt failed: {0}")]
    Failed(String),
}

/// Drives an interactive sign-in.
#[async_trait]
pub trait InteractivePrompt: Send + Sync + std::fmt::Debug {
    /// Present `request` to the user and wait for the authorization code.
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> std::result::Result<AuthorizationCode, PromptError>;
}
