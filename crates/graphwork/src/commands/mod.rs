//! CLI command handlers.

pub mod files;
pub mod me;
pub mod token;
pub mod users;
pub mod workflow;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use graphwork_auth::{Audience, BearerToken, ClientSecret, Credential, Scope, TokenEndpoint};
use graphwork_client::GraphClient;
use graphwork_config::{GraphConfig, process_env};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::prompt::ConsolePrompt;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration (files + environment).
    pub config: GraphConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output: extra detail in human-readable views.
    pub verbose: bool,
    /// Cancelled on Ctrl-C.
    pub cancel: CancellationToken,
}

impl Context {
    /// Token endpoint of the configured authority.
    pub fn endpoint(&self) -> Result<TokenEndpoint> {
        let authority = self.config.graph_settings().authority;
        TokenEndpoint::new(&authority).with_context(|| format!("bad authority '{}'", authority))
    }

    /// Graph client for `audience`, cancelled with the process.
    pub fn client(&self, audience: Audience) -> Result<GraphClient> {
        let settings = self.config.graph_settings();
        let client = GraphClient::builder()
            .base_url(settings.base_url)
            .timeout(settings.timeout)
            .audience(audience)
            .user_agent(concat!("graphwork/", env!("CARGO_PKG_VERSION")))
            .cancellation_token(self.cancel.clone())
            .build()?;
        Ok(client)
    }

    /// Client-credentials flow from `[app]`.
    pub fn app_credential(&self) -> Result<Credential> {
        let app = self.config.app_settings(&process_env)?;
        let audience = app
            .audience
            .map(Audience::new)
            .unwrap_or_else(Audience::graph);
        Ok(Credential::Application {
            tenant_id: app.tenant_id,
            client_id: app.client_id,
            client_secret: ClientSecret::new(app.client_secret),
            audience,
        })
    }

    /// Interactive flow from `[delegated]`; `scopes` overrides the configured ones.
    pub fn delegated_credential(&self, scopes: Option<&[String]>) -> Result<Credential> {
        let delegated = self.config.delegated_settings()?;
        let raw = scopes.unwrap_or(&delegated.scopes);
        let scopes = raw
            .iter()
            .map(|s| Scope::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Credential::Delegated {
            tenant_id: delegated.tenant_id,
            client_id: delegated.client_id,
            redirect_uri: delegated.redirect_uri,
            scopes,
            prompt: Arc::new(ConsolePrompt { open_browser: true }),
        })
    }

    /// On-behalf-of exchange of `upstream` from `[exchange]`.
    pub fn exchange_credential(&self, upstream: BearerToken) -> Result<Credential> {
        let exchange = self.config.exchange_settings(&process_env)?;
        let scopes = exchange
            .scopes
            .iter()
            .map(|s| Scope::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Credential::DelegatedExchange {
            tenant_id: exchange.tenant_id,
            client_id: exchange.client_id,
            client_secret: ClientSecret::new(exchange.client_secret),
            upstream,
            scopes,
        })
    }

    /// Acquire `credential`'s token.
    pub async fn acquire(&self, credential: &Credential) -> Result<BearerToken> {
        let endpoint = self.endpoint()?;
        let flow = credential.flow();
        tracing::debug!(%flow, "acquiring token");
        let token = tokio::select! {
            _ = self.cancel.cancelled() => anyhow::bail!("cancelled"),
            token = credential.acquire(&endpoint) => token?,
        };
        tracing::info!(
            %flow,
            audience = %token.audience(),
            expires_in = token.expires_in_secs(),
            "token acquired"
        );
        Ok(token)
    }

    /// Sign in interactively with the configured delegated scopes.
    pub async fn delegated_token(&self) -> Result<BearerToken> {
        let credential = self.delegated_credential(None)?;
        self.acquire(&credential).await
    }
}

/// Print `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
