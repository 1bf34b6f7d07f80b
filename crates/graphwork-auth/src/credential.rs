//! Credential flows.
//!
//! Each [`Credential`] variant carries only the fields its grant needs.

use std::fmt;
use std::sync::Arc;

use crate::endpoint::TokenEndpoint;
use crate::error::{AuthError, Result};
use crate::pkce::{PkceChallenge, build_authorization_url, generate_state};
use crate::prompt::{AuthorizationRequest, InteractivePrompt, PromptError};
use crate::scope::{self, Audience, Scope};
use crate::token::BearerToken;

/// Grant type for the on-behalf-of exchange.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Which trust model a credential uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Application,
    Delegated,
    DelegatedExchange,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Application => "application",
            FlowKind::Delegated => "delegated",
            FlowKind::DelegatedExchange => "delegated-exchange",
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client secret that never shows up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(<redacted>)")
    }
}

/// A configured means of obtaining a bearer token for one audience.
#[derive(Debug, Clone)]
pub enum Credential {
    /// App-only client credentials. Requests `<audience>/.default`.
    Application {
        tenant_id: String,
        client_id: String,
        client_secret: ClientSecret,
        audience: Audience,
    },

    /// Interactive sign-in of a human through `prompt`.
    ///
    /// Empty `scopes` means the registration's configured permissions on
    /// Microsoft Graph (`https://graph.microsoft.com/.default`).
    Delegated {
        tenant_id: String,
        client_id: String,
        redirect_uri: String,
        scopes: Vec<Scope>,
        prompt: Arc<dyn InteractivePrompt>,
    },

    /// On-behalf-of exchange of `upstream` for a token on a new audience.
    ///
    /// `scopes` must name the target exactly; see [`crate::scope`] for why a
    /// bare `.default` lands on Graph.
    DelegatedExchange {
        tenant_id: String,
        client_id: String,
        client_secret: ClientSecret,
        upstream: BearerToken,
        scopes: Vec<Scope>,
    },
}

impl Credential {
    pub fn flow(&self) -> FlowKind {
        match self {
            Credential::Application { .. } => FlowKind::Application,
            Credential::Delegated { .. } => FlowKind::Delegated,
            Credential::DelegatedExchange { .. } => FlowKind::DelegatedExchange,
        }
    }

    /// The audience the acquired token will be bound to.
    pub fn audience(&self) -> Result<Audience> {
        match self {
            Credential::Application { audience, .. } => Ok(audience.clone()),
            Credential::Delegated { scopes, .. } => scope::audience_of(&delegated_scopes(scopes)),
            Credential::DelegatedExchange { scopes, .. } => scope::audience_of(scopes),
        }
    }

    /// Run the flow against `endpoint`. Never retries.
    pub async fn acquire(&self, endpoint: &TokenEndpoint) -> Result<BearerToken> {
        match self {
            Credential::Application {
                tenant_id,
                client_id,
                client_secret,
                audience,
            } => {
                require(client_id, "client id")?;
                require(client_secret.expose(), "client secret")?;
                let scope = audience.default_scope();
                let form = [
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.expose()),
                    ("scope", scope.as_str()),
                ];
                endpoint
                    .request_token(FlowKind::Application, tenant_id, &form, audience.clone())
                    .await
            }

            Credential::Delegated {
                tenant_id,
                client_id,
                redirect_uri,
                scopes,
                prompt,
            } => {
                require(client_id, "client id")?;
                let scopes = delegated_scopes(scopes);
                let audience = scope::audience_of(&scopes)?;
                let scope = scope::join(&scopes);

                let pkce = PkceChallenge::generate();
                let state = generate_state();
                let authorize = endpoint.authorize_url(tenant_id)?;
                let request = AuthorizationRequest {
                    url: build_authorization_url(
                        &authorize,
                        client_id,
                        redirect_uri,
                        &scope,
                        &pkce.challenge,
                        &state,
                    ),
                    redirect_uri: redirect_uri.clone(),
                    state: state.clone(),
                };

                tracing::debug!(tenant = %tenant_id, audience = %audience, "starting interactive sign-in");
                let code = prompt.authorize(&request).await.map_err(prompt_error)?;
                if code.state != state {
                    return Err(AuthError::StateMismatch);
                }

                let form = [
                    ("grant_type", "authorization_code"),
                    ("client_id", client_id.as_str()),
                    ("code", code.code.as_str()),
                    ("redirect_uri", redirect_uri.as_str()),
                    ("code_verifier", pkce.verifier.as_str()),
                    ("scope", scope.as_str()),
                ];
                endpoint
                    .request_token(FlowKind::Delegated, tenant_id, &form, audience)
                    .await
            }

            Credential::DelegatedExchange {
                tenant_id,
                client_id,
                client_secret,
                upstream,
                scopes,
            } => {
                require(client_id, "client id")?;
                require(client_secret.expose(), "client secret")?;
                if upstream.secret().is_empty() {
                    return Err(AuthError::UpstreamTokenInvalid(
                        "no upstream token".to_string(),
                    ));
                }
                if upstream.is_expired() {
                    return Err(AuthError::UpstreamTokenInvalid(format!(
                        "upstream token for {} expired at {}",
                        upstream.audience(),
                        upstream.expires_at()
                    )));
                }
                let audience = scope::audience_of(scopes)?;
                let scope = scope::join(scopes);

                let form = [
                    ("grant_type", JWT_BEARER_GRANT),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.expose()),
                    ("assertion", upstream.secret()),
                    ("scope", scope.as_str()),
                    ("requested_token_use", "on_behalf_of"),
                ];
                endpoint
                    .request_token(FlowKind::DelegatedExchange, tenant_id, &form, audience)
                    .await
            }
        }
    }
}

fn delegated_scopes(scopes: &[Scope]) -> Vec<Scope> {
    if scopes.iter().any(|s| !s.is_oidc()) {
        return scopes.to_vec();
    }
    let mut scopes = scopes.to_vec();
    scopes.push(Audience::graph().default_scope());
    scopes
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AuthError::Config(format!("{} is empty", what)));
    }
    Ok(())
}

fn prompt_error(err: PromptError) -> AuthError {
    match err {
        PromptError::Cancelled => AuthError::UserCancelled,
        PromptError::Denied { error, description } => match error.as_str() {
            "access_denied" => AuthError::UserCancelled,
            "interaction_required" | "consent_required" | "login_required" => {
                AuthError::InteractionRequired(description)
            }
            _ => AuthError::IdentityProvider {
                status: 0,
                error,
                description,
            },
        },
        PromptError::Failed(msg) => AuthError::InteractionRequired(msg),
    }
}
