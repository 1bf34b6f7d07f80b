//! Authenticated HTTP client.

use std::sync::Arc;
use std::time::Duration;

use graphwork_auth::{Audience, BearerToken};
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::api::{DrivesApi, UsersApi};
use crate::error::{HttpError, Result};

/// Microsoft Graph v1.0 root.
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0/";

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one resource audience.
///
/// Every call takes the bearer token explicitly; the client holds no session.
/// The token's audience must equal the client's audience, otherwise the call
/// fails before anything is sent.
///
/// # Example
///
/// ```no_run
/// use graphwork_client::GraphClient;
///
/// # async fn example(token: graphwork_auth::BearerToken) -> graphwork_client::Result<()> {
/// let client = GraphClient::builder().build()?;
/// let me = client.users().me(&token).await?;
/// println!("{}", me.id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GraphClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    audience: Audience,
    timeout: Duration,
    cancel: CancellationToken,
}

impl GraphClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn audience(&self) -> &Audience {
        &self.inner.audience
    }

    /// Token that aborts in-flight and future calls of this client when cancelled.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the users API.
    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.clone())
    }

    /// Access the drives API.
    pub fn drives(&self) -> DrivesApi {
        DrivesApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTTP verbs
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve a request target.
    ///
    /// Absolute URLs (continuation cursors) bypass the base URL; anything else
    /// is a path relative to it. Absolute targets still pass through
    /// [`Url::parse`], so an already percent-encoded cursor is unchanged while
    /// raw spaces or quotes in its query are encoded.
    pub fn url(&self, target: &str) -> Result<Url> {
        if is_absolute(target) {
            return Ok(Url::parse(target)?);
        }
        let path = target.trim_start_matches('/');
        Ok(self.inner.base_url.join(path)?)
    }

    pub async fn get(&self, target: &str, token: &BearerToken) -> Result<Value> {
        self.send(Method::GET, target, token, None).await
    }

    pub async fn post(&self, target: &str, token: &BearerToken, body: &Value) -> Result<Value> {
        self.send(Method::POST, target, token, Some(body)).await
    }

    pub async fn patch(&self, target: &str, token: &BearerToken, body: &Value) -> Result<Value> {
        self.send(Method::PATCH, target, token, Some(body)).await
    }

    /// Send one request with `token` attached.
    ///
    /// Returns the parsed JSON body, or `Value::Null` for an empty 2xx body.
    pub async fn send(
        &self,
        method: Method,
        target: &str,
        token: &BearerToken,
        body: Option<&Value>,
    ) -> Result<Value> {
        if self.inner.cancel.is_cancelled() {
            return Err(HttpError::Cancelled);
        }
        if token.audience() != &self.inner.audience {
            return Err(HttpError::AudienceMismatch {
                expected: self.inner.audience.clone(),
                actual: token.audience().clone(),
            });
        }
        if token.is_expired() {
            return Err(HttpError::TokenExpired(token.expires_at()));
        }

        let url = self.url(target)?;
        tracing::debug!(%method, %url, "sending request");

        let mut request = self
            .inner
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(token.secret())
            .timeout(self.inner.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, HttpError>((status, bytes))
        };

        let (status, bytes) = tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => {
                tracing::debug!(%method, %url, "request cancelled");
                return Err(HttpError::Cancelled);
            }
            result = exchange => result?,
        };

        tracing::debug!(%method, %url, status = status.as_u16(), "received response");

        if !status.is_success() {
            return Err(HttpError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| HttpError::MalformedBody(e.to_string()))
    }

    /// Sleep for `duration` unless the client is cancelled first.
    pub(crate) async fn pause(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => Err(HttpError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

fn is_absolute(target: &str) -> bool {
    let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

/// Builder for creating a [`GraphClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    audience: Option<Audience>,
    timeout: Duration,
    user_agent: Option<String>,
    cancel: Option<CancellationToken>,
}

impl ClientBuilder {
    /// Create a new builder targeting Microsoft Graph.
    pub fn new() -> Self {
        Self {
            base_url: None,
            audience: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            cancel: None,
        }
    }

    /// Set the base URL (defaults to [`GRAPH_BASE_URL`]).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the audience tokens must carry (defaults to Microsoft Graph).
    pub fn audience(mut self, audience: Audience) -> Self {
        self.audience = Some(audience);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Tie the client to an external cancellation token.
    pub fn cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<GraphClient> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| GRAPH_BASE_URL.to_string());

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("graphwork-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder().user_agent(user_agent).build()?;

        Ok(GraphClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                audience: self.audience.unwrap_or_else(Audience::graph),
                timeout: self.timeout,
                cancel: self.cancel.unwrap_or_default(),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
