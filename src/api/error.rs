//! Failure taxonomy of the gate and protected endpoints.

use axum::{
    http::{header::RETRY_AFTER, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::report::EventKind;

/// Attempts left at or below which the 401 body carries a lockout warning.
const LOW_ATTEMPTS_WARNING: u32 = 3;

pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("rate limited for {cooldown_remaining}s")]
    RateLimited { cooldown_remaining: u64 },

    /// `error` is the summary shown to the client; `details` maps field
    /// names to messages and is omitted when empty.
    #[error("request validation failed: {error}")]
    ValidationFailed {
        error: &'static str,
        details: FieldErrors,
    },

    #[error("invalid credential")]
    InvalidCredential { attempts_remaining: u32 },

    /// Missing or unusable configuration. Clients see `fallback`; the
    /// detail only goes to the reporter.
    #[error("configuration error: {detail}")]
    ConfigurationError {
        detail: String,
        status: StatusCode,
        fallback: Fallback,
    },

    /// No valid session for the resource. Rendered as 404 so gated
    /// resources cannot be enumerated.
    #[error("not found")]
    Unauthorized,

    /// An outside service failed; `message` is what the client sees.
    #[error("upstream failure: {detail}")]
    UpstreamFailure {
        detail: String,
        message: &'static str,
    },

    #[error("unexpected failure: {0:#}")]
    UnexpectedFailure(#[from] anyhow::Error),
}

/// Client-facing body used when a configuration error surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    /// Indistinguishable from a wrong password.
    InvalidPassword { attempts_remaining: u32 },
    Message(&'static str),
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    details: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cooldown_remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: None,
            attempts_remaining: None,
            cooldown_remaining: None,
            message: None,
        }
    }

    fn invalid_password(attempts_remaining: u32) -> Self {
        let message = (attempts_remaining <= LOW_ATTEMPTS_WARNING).then(|| {
            if attempts_remaining == 0 {
                "No attempts remaining. Further attempts are temporarily locked.".to_string()
            } else {
                format!(
                    "{attempts_remaining} attempt{} remaining before a temporary lockout.",
                    if attempts_remaining == 1 { "" } else { "s" }
                )
            }
        });
        Self {
            attempts_remaining: Some(attempts_remaining),
            message,
            ..Self::new("Invalid password")
        }
    }
}

impl GateError {
    /// Event kind for failures operators need to hear about.
    #[must_use]
    pub fn report_kind(&self) -> Option<EventKind> {
        match self {
            Self::ConfigurationError { .. } => Some(EventKind::Configuration),
            Self::UpstreamFailure { .. } => Some(EventKind::Upstream),
            Self::UnexpectedFailure(_) => Some(EventKind::Unexpected),
            _ => None,
        }
    }

    /// Gate body validation failure.
    #[must_use]
    pub fn invalid_request(details: FieldErrors) -> Self {
        Self::ValidationFailed {
            error: "Invalid request",
            details,
        }
    }

    /// Validation failure on a single field.
    #[must_use]
    pub fn invalid_field(error: &'static str, field: &str, message: impl Into<String>) -> Self {
        let mut details = FieldErrors::new();
        details.insert(field.to_string(), vec![message.into()]);
        Self::ValidationFailed { error, details }
    }

    /// Configuration error that answers exactly like a wrong password.
    #[must_use]
    pub fn unconfigured_password(detail: impl Into<String>, attempts_remaining: u32) -> Self {
        Self::ConfigurationError {
            detail: detail.into(),
            status: StatusCode::UNAUTHORIZED,
            fallback: Fallback::InvalidPassword { attempts_remaining },
        }
    }

    /// Configuration error that answers 500 with a generic message.
    #[must_use]
    pub fn misconfigured(detail: impl Into<String>, message: &'static str) -> Self {
        Self::ConfigurationError {
            detail: detail.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            fallback: Fallback::Message(message),
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match self {
            Self::RateLimited { cooldown_remaining } => {
                let minutes = cooldown_remaining.div_ceil(60).max(1);
                let body = ErrorBody {
                    cooldown_remaining: Some(cooldown_remaining),
                    ..ErrorBody::new(format!(
                        "Too many attempts. Please try again in {minutes} minute{}.",
                        if minutes == 1 { "" } else { "s" }
                    ))
                };
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(RETRY_AFTER, cooldown_remaining.to_string())],
                    Json(body),
                )
                    .into_response()
            }
            Self::ValidationFailed { error, details } => {
                let body = ErrorBody {
                    details: (!details.is_empty()).then_some(details),
                    ..ErrorBody::new(error)
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            Self::InvalidCredential { attempts_remaining } => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody::invalid_password(attempts_remaining)),
            )
                .into_response(),
            Self::ConfigurationError {
                status, fallback, ..
            } => match fallback {
                Fallback::InvalidPassword { attempts_remaining } => {
                    (status, Json(ErrorBody::invalid_password(attempts_remaining))).into_response()
                }
                Fallback::Message(message) => (status, Json(ErrorBody::new(message))).into_response(),
            },
            Self::Unauthorized => StatusCode::NOT_FOUND.into_response(),
            Self::UpstreamFailure { message, .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(message))).into_response()
            }
            Self::UnexpectedFailure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("An error occurred")),
            )
                .into_response(),
        }
    }
}
