//! Contract e-signature flow.
//!
//! A visitor holding a session for a proposal submits their details; the
//! agreement is rendered through a [`ContractRenderer`] and, when a sender
//! address is configured, mailed to the signer through a [`Mailer`]. Both are
//! boundaries: the shipped implementations render plain text and log instead
//! of delivering.

mod mail;
mod render;

pub use mail::{LogMailer, MailMessage, Mailer};
pub use render::{attachment_filename, ContractRenderer, Document, TextContractRenderer};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::proposals::Proposal;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Invalid email address")]
    InvalidEmail,
}

/// Raw form body; every field is optional here so missing ones surface as a
/// validation error instead of a deserialization failure.
#[derive(ToSchema, Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContractSubmission {
    pub name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub proposal_id: Option<String>,
}

/// Validated signer details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signer {
    pub name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub address: String,
}

impl ContractSubmission {
    /// Check the signer fields. The proposal id is checked separately
    /// against the registry.
    ///
    /// # Errors
    /// Returns [`SubmissionError`] when a field is missing or blank, or the
    /// email does not look like an address.
    pub fn signer(&self) -> Result<Signer, SubmissionError> {
        let field = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .ok_or(SubmissionError::MissingFields)
        };

        let signer = Signer {
            name: field(&self.name)?,
            title: field(&self.title)?,
            email: field(&self.email)?,
            phone: field(&self.phone)?,
            company: field(&self.company)?,
            address: field(&self.address)?,
        };

        if !valid_email(&signer.email) {
            return Err(SubmissionError::InvalidEmail);
        }

        Ok(signer)
    }
}

/// Everything the renderer needs to produce the signed agreement.
#[derive(Clone, Copy, Debug)]
pub struct SignedContract<'a> {
    pub proposal: &'a Proposal,
    pub signer: &'a Signer,
    pub client_ip: &'a str,
    pub signed_at: DateTime<Utc>,
}

/// Basic email format check.
pub(crate) fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}
