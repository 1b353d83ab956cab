//! Cookie-backed session store.

use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::debug;

use super::{Session, SessionCodec, SessionError, SESSION_MAX_AGE};
use crate::unix_millis;

pub const SESSION_COOKIE_NAME: &str = "auth-session";

/// Session access as seen by handlers.
///
/// Writes return the `Set-Cookie` value instead of mutating a response, so the
/// caller decides where the header goes.
pub trait SessionStore: Send + Sync {
    /// Issue a session for `resource_id`.
    ///
    /// # Errors
    /// Returns an error if the session cannot be sealed into a cookie.
    fn create_session(&self, resource_id: &str) -> Result<HeaderValue, SessionError>;

    /// Current valid session carried by the request, if any.
    fn get_session(&self, headers: &HeaderMap) -> Option<Session>;

    /// Cookie value that removes the session from the browser.
    ///
    /// # Errors
    /// Returns an error if the header value cannot be built.
    fn clear_session(&self) -> Result<HeaderValue, SessionError>;

    /// Whether the request holds a valid session for exactly `resource_id`.
    fn is_authenticated(&self, headers: &HeaderMap, resource_id: &str) -> bool {
        self.get_session(headers)
            .is_some_and(|session| session.grants(resource_id))
    }
}

#[derive(Clone, Debug)]
pub struct CookieSessionStore {
    codec: SessionCodec,
    max_age: Duration,
    secure: bool,
}

impl CookieSessionStore {
    #[must_use]
    pub fn new(codec: SessionCodec) -> Self {
        Self {
            codec,
            max_age: SESSION_MAX_AGE,
            secure: true,
        }
    }

    /// Only mark cookies secure when the site is served over HTTPS.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// # Errors
    /// Returns an error if the session cannot be sealed into a cookie.
    pub fn create_session_at(
        &self,
        resource_id: &str,
        now_millis: i64,
    ) -> Result<HeaderValue, SessionError> {
        let blob = self.codec.encrypt(&Session::new(resource_id, now_millis))?;
        let mut cookie = format!(
            "{SESSION_COOKIE_NAME}={blob}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.max_age.as_secs()
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        Ok(HeaderValue::from_str(&cookie)?)
    }

    #[must_use]
    pub fn get_session_at(&self, headers: &HeaderMap, now_millis: i64) -> Option<Session> {
        let blob = extract_cookie(headers, SESSION_COOKIE_NAME)?;
        let session = self.codec.decrypt(&blob)?;

        // The browser should have dropped the cookie already; the payload
        // timestamp is authoritative.
        if session.is_expired_at(now_millis, self.max_age) {
            debug!(resource_id = %session.resource_id, "session expired");
            return None;
        }

        Some(session)
    }
}

impl SessionStore for CookieSessionStore {
    fn create_session(&self, resource_id: &str) -> Result<HeaderValue, SessionError> {
        self.create_session_at(resource_id, unix_millis())
    }

    fn get_session(&self, headers: &HeaderMap) -> Option<Session> {
        self.get_session_at(headers, unix_millis())
    }

    fn clear_session(&self) -> Result<HeaderValue, SessionError> {
        let mut cookie =
            format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
        if self.secure {
            cookie.push_str("; Secure");
        }
        Ok(HeaderValue::from_str(&cookie)?)
    }
}

/// Find a cookie by name across all `Cookie` headers.
pub(crate) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Turn a `Set-Cookie` value into the `Cookie` header a browser would send back.
#[cfg(test)]
pub(crate) fn cookie_pair(set_cookie: &HeaderValue) -> Option<HeaderValue> {
    let value = set_cookie.to_str().ok()?;
    let pair = value.split(';').next()?.trim();
    HeaderValue::from_str(pair).ok()
}
