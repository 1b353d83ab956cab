//! Visitor sessions for gated proposals.
//!
//! A session is a small JSON document sealed with AES-256-GCM and handed to
//! the browser as a single cookie. Nothing is stored server side: the cookie
//! *is* the session, so validity is decided by decrypting it and checking its
//! age against [`SESSION_MAX_AGE`].

mod codec;
mod store;

pub use codec::SessionCodec;
pub use store::{CookieSessionStore, SessionStore, SESSION_COOKIE_NAME};
#[cfg(test)]
pub(crate) use store::cookie_pair;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a session grants access after it was issued.
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session secret must not be empty")]
    EmptySecret,
    #[error("failed to derive session key")]
    KeyDerivation,
    #[error("failed to encrypt session")]
    Encrypt,
    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid cookie value: {0}")]
    Cookie(#[from] axum::http::header::InvalidHeaderValue),
}

/// Access grant for one gated resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub resource_id: String,
    pub authenticated: bool,
    /// Unix time in milliseconds.
    pub issued_at: i64,
}

impl Session {
    #[must_use]
    pub fn new(resource_id: impl Into<String>, issued_at: i64) -> Self {
        Self {
            resource_id: resource_id.into(),
            authenticated: true,
            issued_at,
        }
    }

    /// A session stays valid up to and including `issued_at + max_age`.
    #[must_use]
    pub fn is_expired_at(&self, now_millis: i64, max_age: Duration) -> bool {
        let max_age = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        now_millis.saturating_sub(self.issued_at) > max_age
    }

    #[must_use]
    pub fn grants(&self, resource_id: &str) -> bool {
        self.authenticated && self.resource_id == resource_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    #[test]
    fn session_serializes_with_camel_case_fields() -> anyhow::Result<()> {
        let session = Session::new("adb", 1_700_000_000_000);
        let value = serde_json::to_value(&session)?;
        assert_eq!(value["resourceId"], "adb");
        assert_eq!(value["authenticated"], true);
        assert_eq!(value["issuedAt"], 1_700_000_000_000_i64);
        Ok(())
    }

    #[test]
    fn expiry_boundary() {
        let issued = 1_700_000_000_000;
        let session = Session::new("adb", issued);
        assert!(!session.is_expired_at(issued + 24 * HOUR_MS - 1000, SESSION_MAX_AGE));
        assert!(!session.is_expired_at(issued + 24 * HOUR_MS, SESSION_MAX_AGE));
        assert!(session.is_expired_at(issued + 24 * HOUR_MS + 1000, SESSION_MAX_AGE));
    }

    #[test]
    fn grants_only_matching_resource() {
        let session = Session::new("adb", 0);
        assert!(session.grants("adb"));
        assert!(!session.grants("acme"));

        let revoked = Session {
            authenticated: false,
            ..session
        };
        assert!(!revoked.grants("adb"));
    }
}
