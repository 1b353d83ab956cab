//! Password gate: `POST /auth/verify`.

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    api::{
        error::{ErrorBody, FieldErrors, GateError},
        state::AppState,
        utils::{client_identifier, redirect_target, resource_from_return_url},
    },
    verifier::Verification,
};

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub password: String,
    pub return_url: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    success: bool,
    redirect_url: String,
}

#[utoipa::path(
    post,
    path = "/auth/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Password accepted; session cookie set", body = VerifyResponse),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 401, description = "Invalid password", body = ErrorBody),
        (status = 429, description = "Too many attempts", body = ErrorBody),
        (status = 500, description = "Unexpected failure", body = ErrorBody)
    ),
    tag = "gate"
)]
pub async fn verify(headers: HeaderMap, state: Extension<Arc<AppState>>, body: Bytes) -> Response {
    match attempt(&headers, &state, &body) {
        Ok((cookie, response)) => ([(SET_COOKIE, cookie)], Json(response)).into_response(),
        Err(err) => state.report(err, "password-gate").into_response(),
    }
}

fn attempt(
    headers: &HeaderMap,
    state: &AppState,
    body: &[u8],
) -> Result<(HeaderValue, VerifyResponse), GateError> {
    let client = client_identifier(headers);

    let decision = state.limiter().check(&client);
    if !decision.allowed {
        if let Some(episode_start) = decision.cooldown_started_at {
            state.alerts().cooldown_started(&client, episode_start);
        }
        return Err(GateError::RateLimited {
            cooldown_remaining: decision.cooldown_remaining_seconds.unwrap_or_default(),
        });
    }

    let request = parse_request(body)?;

    let resource_id = resource_from_return_url(request.return_url.as_deref())
        .unwrap_or_else(|| state.config().default_resource().to_string());

    match state.verifier().verify(&resource_id, &request.password) {
        Verification::Valid => {}
        Verification::Invalid => {
            info!(
                resource_id = %resource_id,
                client = %client,
                attempts_remaining = decision.attempts_remaining,
                "password rejected"
            );
            return Err(GateError::InvalidCredential {
                attempts_remaining: decision.attempts_remaining,
            });
        }
        Verification::NotConfigured { key } => {
            warn!(resource_id = %resource_id, "no password configured");
            return Err(GateError::unconfigured_password(
                format!("no password configured for resource {resource_id} ({key})"),
                decision.attempts_remaining,
            ));
        }
    }

    state.limiter().reset(&client);
    let cookie = state
        .sessions()
        .create_session(&resource_id)
        .context("failed to issue session cookie")?;

    info!(resource_id = %resource_id, client = %client, "password accepted");

    Ok((
        cookie,
        VerifyResponse {
            success: true,
            redirect_url: redirect_target(request.return_url.as_deref(), &resource_id),
        },
    ))
}

/// Field-level validation with one message list per field.
fn parse_request(body: &[u8]) -> Result<VerifyRequest, GateError> {
    let mut details = FieldErrors::new();
    let mut fail = |field: &str, message: &str| {
        details
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    };

    let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) else {
        fail("body", "Expected a JSON object");
        return Err(GateError::invalid_request(details));
    };

    let password = match fields.get("password") {
        Some(Value::String(password)) if !password.is_empty() => Some(password.clone()),
        Some(Value::String(_)) => {
            fail("password", "Password is required");
            None
        }
        None | Some(Value::Null) => {
            fail("password", "Required");
            None
        }
        Some(_) => {
            fail("password", "Expected string");
            None
        }
    };

    let return_url = match fields.get("returnUrl") {
        None | Some(Value::Null) => None,
        Some(Value::String(url)) => Some(url.clone()),
        Some(_) => {
            fail("returnUrl", "Expected string");
            None
        }
    };

    match password {
        Some(password) if details.is_empty() => Ok(VerifyRequest {
            password,
            return_url,
        }),
        _ => Err(GateError::invalid_request(details)),
    }
}
