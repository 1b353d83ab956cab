//! Contract e-signature: `POST /api/contract/submit`.

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::Extension,
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::{
    api::{
        error::{ErrorBody, GateError},
        state::AppState,
        utils::client_identifier,
    },
    contract::{ContractSubmission, MailMessage, SignedContract, SubmissionError},
    proposals,
};

#[derive(ToSchema, Serialize, Debug)]
pub struct ContractResponse {
    success: bool,
    message: String,
}

#[utoipa::path(
    post,
    path = "/api/contract/submit",
    request_body = ContractSubmission,
    responses(
        (status = 200, description = "Contract signed", body = ContractResponse),
        (status = 400, description = "Missing fields, bad email or unknown proposal", body = ErrorBody),
        (status = 404, description = "No session for the proposal"),
        (status = 500, description = "Rendering or delivery failed", body = ErrorBody)
    ),
    tag = "proposal"
)]
pub async fn submit(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ContractResponse>, GateError> {
    sign(&headers, &state, &body).map_err(|err| state.report(err, "contract"))?;

    Ok(Json(ContractResponse {
        success: true,
        message: "Contract signed successfully".to_string(),
    }))
}

#[instrument(skip_all)]
fn sign(headers: &HeaderMap, state: &AppState, body: &[u8]) -> Result<(), GateError> {
    let missing = || GateError::ValidationFailed {
        error: "Missing required fields",
        details: Default::default(),
    };

    let submission: ContractSubmission = serde_json::from_slice(body).map_err(|_| missing())?;

    let signer = submission.signer().map_err(|err| match err {
        SubmissionError::MissingFields => missing(),
        SubmissionError::InvalidEmail => {
            GateError::invalid_field("Invalid email address", "email", "Invalid email format")
        }
    })?;

    let proposal_id = submission
        .proposal_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(missing)?;

    let proposal = proposals::get(proposal_id).ok_or_else(|| {
        GateError::invalid_field("Invalid proposal ID", "proposalId", "Unknown proposal")
    })?;

    if !state.sessions().is_authenticated(headers, proposal.id) {
        return Err(GateError::Unauthorized);
    }

    let client = client_identifier(headers);
    let contract = SignedContract {
        proposal,
        signer: &signer,
        client_ip: &client,
        signed_at: Utc::now(),
    };

    let document = state
        .renderer()
        .render(&contract)
        .context("failed to render contract")?;

    match state.config().mail_from() {
        Some(from) => {
            let message = MailMessage::contract_signed(from, proposal, &signer, document);
            state
                .mailer()
                .send(&message)
                .context("failed to send contract email")?;
        }
        None => info!(
            proposal = proposal.id,
            filename = %document.filename,
            "no sender address configured, contract email skipped"
        ),
    }

    info!(proposal = proposal.id, client = %client, "contract signed");

    Ok(())
}
