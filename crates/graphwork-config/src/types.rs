//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [graph]       # endpoints and timeouts
//! [app]         # confidential client for the client-credentials flow
//! [delegated]   # public client for interactive sign-in
//! [exchange]    # confidential API client for the on-behalf-of exchange
//! [site]        # SharePoint site, folders and range for the workflow
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::secrets::{EnvLookup, resolve_secret};

/// Entra ID v2 authority.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Microsoft Graph v1.0 root.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0/";

/// Redirect URI registered for desktop sign-in.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_VERIFY_INTERVAL_MS: u64 = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged. Required fields are checked by the
/// `*_settings` accessors, which run before any network call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub graph: Option<GraphSection>,
    pub app: Option<AppConfig>,
    pub delegated: Option<DelegatedConfig>,
    pub exchange: Option<ExchangeConfig>,
    pub site: Option<SiteConfig>,
}

impl GraphConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections replace sections; fields are not merged individually.
    pub fn merge(&mut self, other: GraphConfig) {
        if other.graph.is_some() {
            self.graph = other.graph;
        }
        if other.app.is_some() {
            self.app = other.app;
        }
        if other.delegated.is_some() {
            self.delegated = other.delegated;
        }
        if other.exchange.is_some() {
            self.exchange = other.exchange;
        }
        if other.site.is_some() {
            self.site = other.site;
        }
    }

    /// Endpoint settings, with defaults for anything unset.
    pub fn graph_settings(&self) -> GraphSettings {
        let section = self.graph.clone().unwrap_or_default();
        GraphSettings {
            base_url: non_empty(&section.base_url)
                .unwrap_or(DEFAULT_GRAPH_URL)
                .to_string(),
            authority: non_empty(&section.authority)
                .unwrap_or(DEFAULT_AUTHORITY)
                .to_string(),
            timeout: Duration::from_secs(section.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Validated `[app]` section with its secret resolved.
    pub fn app_settings(&self, env: EnvLookup<'_>) -> Result<AppSettings> {
        const CTX: &str = "[app]";
        let app = self.app.as_ref().ok_or_else(|| ConfigError::missing("app", "config"))?;
        Ok(AppSettings {
            tenant_id: require(&app.tenant_id, "tenant_id", CTX)?,
            client_id: require(&app.client_id, "client_id", CTX)?,
            client_secret: secret(app.client_secret.as_deref(), APP_SECRET_ENV, "app", env)?,
            audience: non_empty(&app.audience).map(str::to_string),
        })
    }

    /// Validated `[delegated]` section.
    pub fn delegated_settings(&self) -> Result<DelegatedSettings> {
        const CTX: &str = "[delegated]";
        let delegated = self
            .delegated
            .as_ref()
            .ok_or_else(|| ConfigError::missing("delegated", "config"))?;
        Ok(DelegatedSettings {
            tenant_id: require(&delegated.tenant_id, "tenant_id", CTX)?,
            client_id: require(&delegated.client_id, "client_id", CTX)?,
            redirect_uri: non_empty(&delegated.redirect_uri)
                .unwrap_or(DEFAULT_REDIRECT_URI)
                .to_string(),
            scopes: clean_scopes(&delegated.scopes),
        })
    }

    /// Validated `[exchange]` section with its secret resolved.
    pub fn exchange_settings(&self, env: EnvLookup<'_>) -> Result<ExchangeSettings> {
        const CTX: &str = "[exchange]";
        let exchange = self
            .exchange
            .as_ref()
            .ok_or_else(|| ConfigError::missing("exchange", "config"))?;
        let client_id = require(&exchange.client_id, "client_id", CTX)?;
        let upstream_scope = non_empty(&exchange.upstream_scope)
            .map(str::to_string)
            .unwrap_or_else(|| format!("api://{}/default", client_id));
        let scopes = match clean_scopes(&exchange.scopes) {
            scopes if scopes.is_empty() => vec![".default".to_string()],
            scopes => scopes,
        };
        Ok(ExchangeSettings {
            tenant_id: require(&exchange.tenant_id, "tenant_id", CTX)?,
            client_secret: secret(
                exchange.client_secret.as_deref(),
                EXCHANGE_SECRET_ENV,
                "exchange",
                env,
            )?,
            client_id,
            upstream_scope,
            scopes,
        })
    }

    /// Validated `[site]` section.
    pub fn site_settings(&self) -> Result<SiteSettings> {
        const CTX: &str = "[site]";
        let site = self
            .site
            .as_ref()
            .ok_or_else(|| ConfigError::missing("site", "config"))?;

        let range = match (non_empty(&site.table), non_empty(&site.sheet)) {
            (Some(table), None) => RangeSetting::Table(table.to_string()),
            (None, Some(sheet)) => RangeSetting::Worksheet {
                sheet: sheet.to_string(),
                address: require(&site.address, "address", CTX)?,
            },
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid {
                    field: "site.table".to_string(),
                    reason: "set either table or sheet/address, not both".to_string(),
                });
            }
            (None, None) => return Err(ConfigError::missing("table", CTX)),
        };

        Ok(SiteSettings {
            site_id: require(&site.site_id, "site_id", CTX)?,
            source_folder: non_empty(&site.source_folder).map(str::to_string),
            destination_folder: non_empty(&site.destination_folder).map(str::to_string),
            range,
            verify_attempts: site.verify_attempts.unwrap_or(1).max(1),
            verify_interval: Duration::from_millis(
                site.verify_interval_ms.unwrap_or(DEFAULT_VERIFY_INTERVAL_MS),
            ),
        })
    }

    /// Sections that carry a client secret in plaintext.
    pub fn plaintext_secret_sections(&self) -> Vec<&'static str> {
        let mut sections = Vec::new();
        if self
            .app
            .as_ref()
            .is_some_and(|a| non_empty(&a.client_secret).is_some())
        {
            sections.push("app");
        }
        if self
            .exchange
            .as_ref()
            .is_some_and(|e| non_empty(&e.client_secret).is_some())
        {
            sections.push("exchange");
        }
        sections
    }
}

/// Env var holding the `[app]` client secret.
pub const APP_SECRET_ENV: &str = "GRAPH_API_APP_CLIENT_SECRET";

/// Env var holding the `[exchange]` client secret.
pub const EXCHANGE_SECRET_ENV: &str = "GRAPH_API_EXCHANGE_CLIENT_SECRET";

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[graph]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    pub base_url: Option<String>,
    pub authority: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// `[app]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    /// Prefer `GRAPH_API_APP_CLIENT_SECRET`.
    pub client_secret: Option<String>,
    /// Resource the app token is for; Microsoft Graph when unset.
    pub audience: Option<String>,
}

/// `[delegated]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegatedConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scopes: Vec<String>,
}

/// `[exchange]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    /// Prefer `GRAPH_API_EXCHANGE_CLIENT_SECRET`.
    pub client_secret: Option<String>,
    /// Scope the upstream (delegated) token is requested for.
    pub upstream_scope: Option<String>,
    /// Scopes requested in the exchange.
    pub scopes: Vec<String>,
}

/// `[site]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site_id: Option<String>,
    pub source_folder: Option<String>,
    pub destination_folder: Option<String>,
    pub table: Option<String>,
    pub sheet: Option<String>,
    pub address: Option<String>,
    pub verify_attempts: Option<u32>,
    pub verify_interval_ms: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Validated settings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSettings {
    pub base_url: String,
    pub authority: String,
    pub timeout: Duration,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub audience: Option<String>,
}

impl std::fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSettings")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("audience", &self.audience)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedSettings {
    pub tenant_id: String,
    pub client_id: String,
    pub redirect_uri: String,
    /// Empty means the registration's default scope set.
    pub scopes: Vec<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ExchangeSettings {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub upstream_scope: String,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for ExchangeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeSettings")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("upstream_scope", &self.upstream_scope)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Workbook range named in `[site]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSetting {
    Table(String),
    Worksheet { sheet: String, address: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    pub site_id: String,
    pub source_folder: Option<String>,
    pub destination_folder: Option<String>,
    pub range: RangeSetting,
    pub verify_attempts: u32,
    pub verify_interval: Duration,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn require(value: &Option<String>, field: &str, context: &str) -> Result<String> {
    non_empty(value)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::missing(field, context))
}

fn clean_scopes(scopes: &[String]) -> Vec<String> {
    scopes
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn secret(
    config_value: Option<&str>,
    env_var: &str,
    section: &str,
    env: EnvLookup<'_>,
) -> Result<String> {
    resolve_secret(env_var, config_value, env)
        .map(|resolved| resolved.value)
        .ok_or_else(|| ConfigError::SecretNotFound {
            section: section.to_string(),
            env_var: env_var.to_string(),
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
