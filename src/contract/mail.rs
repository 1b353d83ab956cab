use anyhow::Result;
use tracing::info;

use super::{Document, Signer};
use crate::proposals::Proposal;

#[derive(Clone, Debug)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub text: String,
    pub attachment: Option<Document>,
}

impl MailMessage {
    /// Confirmation sent to the signer, copied to the sender address.
    #[must_use]
    pub fn contract_signed(
        from: &str,
        proposal: &Proposal,
        signer: &Signer,
        attachment: Document,
    ) -> Self {
        let text = format!(
            "Hello {name},\n\n\
             Thank you for signing the {system} agreement.\n\n\
             We're excited to partner with {company} on this project. Attached is a copy \
             of the signed agreement for your records.\n\n\
             Next steps:\n\
             1. You'll receive an invoice for the initial payment within 1 business day\n\
             2. Our team will reach out within 24 hours to schedule your kickoff meeting\n\
             3. We'll begin the discovery phase to understand your specific needs\n\n\
             If you have any questions, reply to this email.\n",
            name = signer.name,
            system = proposal.subtitle,
            company = signer.company,
        );

        Self {
            from: from.to_string(),
            to: signer.email.clone(),
            cc: Some(from.to_string()),
            subject: format!("Contract Signed - {}", signer.company),
            text,
            attachment: Some(attachment),
        }
    }
}

/// Outbound email boundary.
pub trait Mailer: Send + Sync {
    /// Deliver a message.
    ///
    /// # Errors
    /// Returns an error if delivery fails.
    fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Logs the envelope instead of sending real email.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &MailMessage) -> Result<()> {
        info!(
            to = %message.to,
            cc = message.cc.as_deref().unwrap_or(""),
            subject = %message.subject,
            attachment = message.attachment.as_ref().map_or("", |doc| doc.filename.as_str()),
            "contract email send stub"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{contract::tests::submission, proposals};

    #[test]
    fn contract_signed_message_envelope() -> Result<()> {
        let signer = submission().signer()?;
        let proposal = proposals::get("adb").ok_or_else(|| anyhow::anyhow!("adb missing"))?;
        let document = Document {
            filename: "Contract_Acme_Medical_Board_2025-03-07.txt".to_string(),
            content_type: "text/plain; charset=utf-8",
            bytes: b"signed".to_vec(),
        };

        let message = MailMessage::contract_signed("sales@example.com", proposal, &signer, document);
        assert_eq!(message.to, "jane@example.com");
        assert_eq!(message.cc.as_deref(), Some("sales@example.com"));
        assert_eq!(message.subject, "Contract Signed - Acme Medical Board");
        assert!(message.text.starts_with("Hello Jane Doe,"));
        assert!(message.text.contains("Patient Simulation Training System"));
        assert!(message.attachment.is_some());

        LogMailer.send(&message)
    }
}
