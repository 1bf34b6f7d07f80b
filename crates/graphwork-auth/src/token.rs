//! Audience-bound bearer tokens.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::scope::Audience;

/// An opaque access token together with its validity window and audience.
///
/// Tokens are never refreshed in place; re-run the credential flow to get a new one.
#[derive(Clone)]
pub struct BearerToken {
    token: String,
    expires_at: DateTime<Utc>,
    audience: Audience,
}

impl BearerToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>, audience: Audience) -> Self {
        Self {
            token: token.into(),
            expires_at,
            audience,
        }
    }

    /// Build a token that expires `expires_in_secs` from now.
    ///
    /// Lifetimes past the representable range clamp to the earliest or latest
    /// representable instant.
    pub fn expiring_in(token: impl Into<String>, expires_in_secs: i64, audience: Audience) -> Self {
        let expires_at = expiry_after(expires_in_secs).unwrap_or(if expires_in_secs < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });
        Self::new(token, expires_at, audience)
    }

    /// Like [`expiring_in`](Self::expiring_in), but `None` when the expiry is
    /// not representable.
    pub fn try_expiring_in(
        token: impl Into<String>,
        expires_in_secs: i64,
        audience: Audience,
    ) -> Option<Self> {
        let expires_at = expiry_after(expires_in_secs)?;
        Some(Self::new(token, expires_at, audience))
    }

    /// The raw token, for the `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn audience(&self) -> &Audience {
        &self.audience
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Seconds of validity left, zero once expired.
    pub fn expires_in_secs(&self) -> u64 {
        (self.expires_at - Utc::now()).num_seconds().max(0) as u64
    }

    pub fn expires_in_display(&self) -> String {
        if self.is_expired() {
            "Expired".to_string()
        } else {
            let secs = self.expires_in_secs();
            let hours = secs / 3600;
            let minutes = (secs % 3600) / 60;
            format!("{}h {}m", hours, minutes)
        }
    }
}

fn expiry_after(secs: i64) -> Option<DateTime<Utc>> {
    Utc::now().checked_add_signed(Duration::try_seconds(secs)?)
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("audience", &self.audience)
            .finish()
    }
}
