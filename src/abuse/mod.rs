//! Request filter in front of every route.
//!
//! Vulnerability-scan paths answer `404` on every request, asset trees
//! included (never `403`, nothing to confirm). Static assets and internal
//! endpoints then pass straight through; everything else goes on to:
//!
//! 1. automation user agents answer `403` unless allow-listed
//! 2. the coarse per-client limiter answers `429` with `Retry-After`
//! 3. `/proposal` links are normalized; `?pw=` links go through the gate's front door
//!
//! Everything that passes gets baseline hardening headers.

mod limiter;
mod paths;
mod user_agent;

pub use limiter::{Admission, RequestLimiter};
pub use paths::{is_exempt, PathFilter};
pub use user_agent::{Classification, UserAgentFilter};

use axum::{
    extract::{Request, State},
    http::{
        header::{
            REFERRER_POLICY, RETRY_AFTER, USER_AGENT, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
            X_XSS_PROTECTION,
        },
        HeaderMap, HeaderValue, StatusCode, Uri,
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};
use url::form_urlencoded;

use crate::{api::utils::client_identifier, unix_millis};

#[derive(Debug)]
pub struct AbuseGuard {
    paths: PathFilter,
    agents: UserAgentFilter,
    limiter: RequestLimiter,
}

impl AbuseGuard {
    /// # Errors
    /// Returns an error if the bundled path or user-agent patterns fail to compile.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, regex::Error> {
        Ok(Self {
            paths: PathFilter::new()?,
            agents: UserAgentFilter::new()?,
            limiter: RequestLimiter::new(max_requests, window),
        })
    }

    #[must_use]
    pub fn limiter(&self) -> &RequestLimiter {
        &self.limiter
    }
}

/// Middleware entry point, wired with `axum::middleware::from_fn_with_state`.
pub async fn filter(State(guard): State<Arc<AbuseGuard>>, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if guard.paths.is_suspicious(path) {
        debug!(path, "suspicious path");
        return StatusCode::NOT_FOUND.into_response();
    }

    if is_exempt(path) {
        return next.run(request).await;
    }

    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok());
    if guard.agents.classify(user_agent) == Classification::Bot {
        info!(user_agent, path, "blocked automated client");
        return StatusCode::FORBIDDEN.into_response();
    }

    let client = client_identifier(request.headers());
    if let Admission::Limited {
        retry_after_seconds,
    } = guard.limiter.admit(&client, unix_millis())
    {
        info!(client = %client, "request flood limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, retry_after_seconds.to_string())],
            "Too many requests",
        )
            .into_response();
    }

    let mut response = match proposal_redirect(request.uri()) {
        Some(location) => Redirect::temporary(&location).into_response(),
        None => next.run(request).await,
    };
    harden(response.headers_mut());
    response
}

/// Redirect target for `/proposal` links that must not reach the page handler.
fn proposal_redirect(uri: &Uri) -> Option<String> {
    let path = uri.path();
    let rest = match path.strip_prefix("/proposal") {
        Some("") => return Some("/".to_string()),
        Some(rest) => rest.strip_prefix('/')?,
        None => return None,
    };

    if rest.split('/').next().map_or(true, str::is_empty) {
        return Some("/".to_string());
    }

    let password = uri.query().and_then(|query| {
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "pw")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    })?;

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("pw", &password)
        .append_pair("return", path)
        .finish();
    Some(format!("/?{query}"))
}

fn harden(headers: &mut HeaderMap) {
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
}
