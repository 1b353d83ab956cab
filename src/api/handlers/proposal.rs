//! Protected proposal descriptor: `GET /proposal/{id}`.

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use crate::{
    api::{error::GateError, state::AppState},
    proposals::{self, Proposal},
};

#[derive(ToSchema, Serialize, Debug)]
pub struct ProposalResponse {
    id: String,
    title: String,
    subtitle: String,
}

impl From<&Proposal> for ProposalResponse {
    fn from(proposal: &Proposal) -> Self {
        Self {
            id: proposal.id.to_string(),
            title: proposal.title.to_string(),
            subtitle: proposal.subtitle.to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/proposal/{id}",
    params(
        ("id" = String, Path, description = "Proposal id")
    ),
    responses(
        (status = 200, description = "Proposal visible to this session", body = ProposalResponse),
        (status = 404, description = "Unknown proposal or no session for it")
    ),
    tag = "proposal"
)]
pub async fn proposal(
    Path(id): Path<String>,
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
) -> Result<Json<ProposalResponse>, GateError> {
    // Unknown and unauthorized answer the same 404.
    let Some(proposal) = proposals::get(&id) else {
        return Err(GateError::Unauthorized);
    };

    if !state.sessions().is_authenticated(&headers, proposal.id) {
        debug!(proposal = proposal.id, "no session for proposal");
        return Err(GateError::Unauthorized);
    }

    Ok(Json(ProposalResponse::from(proposal)))
}
