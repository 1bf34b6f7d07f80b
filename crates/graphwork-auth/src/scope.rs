//! Scopes and the audiences they resolve to.
//!
//! Entra ID scopes come in three shapes:
//!
//! - fully qualified: `api://<client-id>/access` or `https://graph.microsoft.com/User.Read`
//! - resource by app id: `00000003-0000-0000-c000-000000000000/.default`
//! - bare: `User.Read`, `.default`, `default`
//!
//! Bare scopes carry no resource, and the identity provider resolves them
//! against the default resource provider (Microsoft Graph). That includes a
//! bare `.default`: it yields a Graph token with Graph's default permission
//! set, NOT a token for the confidential client's own API. Callers that want
//! their own API must pass the fully qualified form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Resource the identity provider assumes for bare scopes.
pub const DEFAULT_RESOURCE: &str = "https://graph.microsoft.com";

/// Application id of Microsoft Graph, accepted in place of [`DEFAULT_RESOURCE`].
pub const GRAPH_APP_ID: &str = "00000003-0000-0000-c000-000000000000";

/// OpenID Connect scopes that request claims, not resource access.
const OIDC_SCOPES: &[&str] = &["openid", "profile", "email", "offline_access"];

/// The intended recipient resource of a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Audience(String);

impl Audience {
    /// Create an audience, normalizing away a trailing slash.
    ///
    /// Graph's application id names the same resource as its URL and becomes
    /// [`Audience::graph`].
    pub fn new(resource: impl Into<String>) -> Self {
        let resource = resource.into();
        let resource = resource.trim().trim_end_matches('/');
        if resource.eq_ignore_ascii_case(GRAPH_APP_ID) {
            return Self(DEFAULT_RESOURCE.to_string());
        }
        Self(resource.to_string())
    }

    /// Microsoft Graph.
    pub fn graph() -> Self {
        Self::new(DEFAULT_RESOURCE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `<resource>/.default` scope for this audience.
    pub fn default_scope(&self) -> Scope {
        Scope {
            raw: format!("{}/.default", self.0),
            resource: Some(self.clone()),
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single requested scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    raw: String,
    /// `None` for OpenID Connect scopes.
    resource: Option<Audience>,
}

impl Scope {
    /// Parse a scope string.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::InvalidScope("empty scope".to_string()));
        }
        if raw.contains(char::is_whitespace) {
            return Err(AuthError::InvalidScope(format!(
                "'{}' contains whitespace; pass scopes individually",
                raw
            )));
        }

        if OIDC_SCOPES.contains(&raw) {
            return Ok(Self {
                raw: raw.to_string(),
                resource: None,
            });
        }

        let resource = match raw.rsplit_once('/') {
            Some((resource, permission)) => {
                let resource = resource.trim_end_matches('/');
                if permission.is_empty() || resource.is_empty() || resource.ends_with(':') {
                    return Err(AuthError::InvalidScope(format!(
                        "'{}' has no permission after the resource",
                        raw
                    )));
                }
                Audience::new(resource)
            }
            None => Audience::graph(),
        };

        Ok(Self {
            raw: raw.to_string(),
            resource: Some(resource),
        })
    }

    /// Parse a space-separated scope list.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>> {
        raw.split_whitespace().map(Self::parse).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The resource this scope grants access to, if any.
    pub fn resource(&self) -> Option<&Audience> {
        self.resource.as_ref()
    }

    pub fn is_oidc(&self) -> bool {
        self.resource.is_none()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Resolve the single audience a set of scopes targets.
///
/// A token is issued for exactly one resource, so mixing resources is an error.
/// OpenID Connect scopes are ignored for audience purposes.
pub fn audience_of(scopes: &[Scope]) -> Result<Audience> {
    let mut resources = scopes.iter().filter_map(Scope::resource);
    let first = resources
        .next()
        .ok_or_else(|| AuthError::InvalidScope("no resource scope requested".to_string()))?;

    if let Some(other) = resources.find(|r| *r != first) {
        return Err(AuthError::InvalidScope(format!(
            "scopes target more than one resource: {} and {}",
            first, other
        )));
    }

    Ok(first.clone())
}

/// Join scopes into the space-separated wire form.
pub fn join(scopes: &[Scope]) -> String {
    scopes
        .iter()
        .map(Scope::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_qualified_api_scope() {
        let scope = Scope::parse("api://1234/.default").unwrap();
        assert_eq!(scope.resource(), Some(&Audience::new("api://1234")));
    }

    #[test]
    fn test_graph_permission_scope() {
        let scope = Scope::parse("https://graph.microsoft.com/User.Read").unwrap();
        assert_eq!(scope.resource(), Some(&Audience::graph()));
    }

    #[test]
    fn test_bare_default_resolves_to_graph_not_own_api() {
        let scope = Scope::parse(".default").unwrap();
        assert_eq!(scope.resource(), Some(&Audience::graph()));

        let scope = Scope::parse("default").unwrap();
        assert_eq!(scope.resource(), Some(&Audience::graph()));
    }

    #[test]
    fn test_app_id_resource() {
        let scope = Scope::parse("00000003-0000-0000-c000-000000000000/.default").unwrap();
        assert_eq!(scope.resource(), Some(&Audience::graph()));
        assert_eq!(scope.as_str(), "00000003-0000-0000-c000-000000000000/.default");

        let scope = Scope::parse("00000003-0000-0000-C000-000000000000/User.Read").unwrap();
        assert_eq!(scope.resource(), Some(&Audience::graph()));

        let scope = Scope::parse("11111111-2222-3333-4444-555555555555/.default").unwrap();
        assert_eq!(
            scope.resource().unwrap().as_str(),
            "11111111-2222-3333-4444-555555555555"
        );
    }

    #[test]
    fn test_rejects_malformed_scopes() {
        assert!(Scope::parse("").is_err());
        assert!(Scope::parse("api://1234/").is_err());
        assert!(Scope::parse("api://1234").is_err());
        assert!(Scope::parse("User.Read Mail.Read").is_err());
    }

    #[test]
    fn test_oidc_scopes_have_no_resource() {
        let scopes = Scope::parse_list("openid offline_access api://abc/access").unwrap();
        assert!(scopes[0].is_oidc());
        assert_eq!(audience_of(&scopes).unwrap(), Audience::new("api://abc"));
    }

    #[test]
    fn test_mixed_resources_rejected() {
        let scopes = Scope::parse_list("api://abc/access User.Read").unwrap();
        assert!(matches!(
            audience_of(&scopes),
            Err(AuthError::InvalidScope(_))
        ));
    }

    #[test]
    fn test_audience_normalizes_trailing_slash() {
        assert_eq!(
            Audience::new("https://graph.microsoft.com/"),
            Audience::graph()
        );
        assert_eq!(
            Audience::graph().default_scope().as_str(),
            "https://graph.microsoft.com/.default"
        );
    }

    #[test]
    fn test_join() {
        let scopes = Scope::parse_list("openid User.Read").unwrap();
        assert_eq!(join(&scopes), "openid User.Read");
    }
}
