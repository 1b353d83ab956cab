//! Session lookup and logout.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::api::{error::GateError, state::AppState};

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    resource_id: String,
    /// Unix milliseconds.
    issued_at: i64,
}

#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "gate"
)]
pub async fn session(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    // Missing, expired and undecryptable cookies all look the same.
    match state.sessions().get_session(&headers) {
        Some(session) if session.authenticated => (
            StatusCode::OK,
            Json(SessionResponse {
                resource_id: session.resource_id,
                issued_at: session.issued_at,
            }),
        )
            .into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "gate"
)]
pub async fn logout(state: Extension<Arc<AppState>>) -> Response {
    match state.sessions().clear_session() {
        Ok(cookie) => (StatusCode::NO_CONTENT, [(SET_COOKIE, cookie)]).into_response(),
        Err(err) => state
            .report(GateError::from(anyhow::Error::from(err)), "session")
            .into_response(),
    }
}
