//! # Gatehouse (password gate for proposal microsites)
//!
//! `gatehouse` serves the backend of a client-gated sales microsite: each
//! proposal page sits behind a shared password, visitors who know it get an
//! encrypted session cookie, and everything else (contract signing, the voice
//! demo) hangs off that session.
//!
//! ## Password gate
//!
//! `POST /auth/verify` runs a fixed pipeline: per-client rate limiting, body
//! validation, constant-time password check against
//! `PROPOSAL_PASSWORD_<RESOURCE>`, then a sealed `auth-session` cookie.
//!
//! - **Sessions:** AES-256-GCM sealed JSON in the cookie itself, 24 hour lifetime,
//!   bound to exactly one resource id.
//! - **Rate limiting:** 10 attempts per 15 minutes per client, then a 15 minute
//!   cooldown. State lives in process memory only.
//!
//! ## Abuse filtering
//!
//! A middleware in front of every route drops vulnerability-scan paths (404),
//! automation user agents (403) and request floods (429), and adds baseline
//! hardening headers to whatever passes.
//!
//! Requests for a gated resource without a matching session answer
//! `404 Not Found`, never `401`/`403`, so proposal ids cannot be enumerated.

pub mod abuse;
pub mod api;
pub mod cli;
pub mod contract;
pub mod proposals;
pub mod rate_limit;
pub mod report;
pub mod session;
pub mod verifier;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Current wall-clock time as unix milliseconds.
#[must_use]
pub fn unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
