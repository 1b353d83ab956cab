#![allow(clippy::needless_for_each)]

use crate::{
    api::{
        error::ErrorBody,
        handlers::{contract, health, proposal, session, verify, voice},
    },
    contract::ContractSubmission,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        verify::verify,
        session::session,
        session::logout,
        proposal::proposal,
        contract::submit,
        voice::signed_url,
    ),
    components(
        schemas(
            health::Health,
            ErrorBody,
            verify::VerifyRequest,
            verify::VerifyResponse,
            session::SessionResponse,
            proposal::ProposalResponse,
            ContractSubmission,
            contract::ContractResponse,
            voice::SignedUrl,
        )
    ),
    tags(
        (name = "gate", description = "Password gate and visitor sessions"),
        (name = "proposal", description = "Gated proposal content and contract signing"),
        (name = "voice", description = "Voice assistant"),
        (name = "health", description = "Service health"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
