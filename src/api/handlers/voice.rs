//! Signed conversation URL for the voice assistant widget.

use axum::{extract::Extension, Json};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::api::{
    error::{ErrorBody, GateError},
    state::AppState,
};

const FAILED: &str = "Failed to generate signed URL";

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    signed_url: String,
}

#[derive(Deserialize)]
struct UpstreamSignedUrl {
    signed_url: String,
}

#[utoipa::path(
    get,
    path = "/api/voice/signed-url",
    responses(
        (status = 200, description = "Short-lived conversation URL", body = SignedUrl),
        (status = 500, description = "Voice service unavailable or not configured", body = ErrorBody)
    ),
    tag = "voice"
)]
pub async fn signed_url(state: Extension<Arc<AppState>>) -> Result<Json<SignedUrl>, GateError> {
    fetch(&state)
        .await
        .map(|signed_url| Json(SignedUrl { signed_url }))
        .map_err(|err| state.report(err, "voice"))
}

#[instrument(skip_all)]
async fn fetch(state: &AppState) -> Result<String, GateError> {
    let voice = state.config().voice();
    let (Some(agent_id), Some(api_key)) = (voice.agent_id(), voice.api_key()) else {
        return Err(GateError::misconfigured(
            "voice agent id or api key not configured",
            "Service configuration error",
        ));
    };

    let url = format!("{}/v1/convai/conversation/get_signed_url", voice.api_url());
    debug!(url = %url, "requesting signed url");

    let upstream = |detail: String| GateError::UpstreamFailure {
        detail,
        message: FAILED,
    };

    let response = state
        .http()
        .get(&url)
        .query(&[("agent_id", agent_id)])
        .header("xi-api-key", api_key.expose_secret())
        .send()
        .await
        .map_err(|err| upstream(format!("voice request failed: {err}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(upstream(format!("voice api responded {status}")));
    }

    let body: UpstreamSignedUrl = response
        .json()
        .await
        .map_err(|err| upstream(format!("invalid voice api response: {err}")))?;

    Ok(body.signed_url)
}
