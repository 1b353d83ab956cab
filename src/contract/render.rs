use anyhow::Result;
use chrono::SecondsFormat;
use std::fmt::Write as _;

use super::SignedContract;

/// Rendered agreement, ready to attach to an email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Turns a signed contract into a document. A PDF backend can sit behind
/// this trait; the default writes plain text.
pub trait ContractRenderer: Send + Sync {
    /// # Errors
    /// Returns an error if the document cannot be produced.
    fn render(&self, contract: &SignedContract<'_>) -> Result<Document>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TextContractRenderer;

impl ContractRenderer for TextContractRenderer {
    fn render(&self, contract: &SignedContract<'_>) -> Result<Document> {
        let signer = contract.signer;
        let mut text = String::new();

        writeln!(text, "{} AGREEMENT", contract.proposal.subtitle.to_uppercase())?;
        writeln!(text, "{}", contract.proposal.title)?;
        writeln!(text)?;
        writeln!(
            text,
            "This agreement was electronically signed by {}",
            signer.name
        )?;
        writeln!(text, "Title: {} at {}", signer.title, signer.company)?;
        writeln!(text, "Email: {}", signer.email)?;
        writeln!(text, "Phone: {}", signer.phone)?;
        writeln!(text, "Address: {}", signer.address)?;
        writeln!(
            text,
            "Date: {}",
            contract.signed_at.format("%B %-d, %Y %H:%M UTC")
        )?;
        writeln!(text, "IP Address: {}", contract.client_ip)?;
        writeln!(text)?;
        writeln!(text, "--- ELECTRONIC SIGNATURE AUDIT TRAIL ---")?;
        writeln!(
            text,
            "Signed electronically for proposal {} on {}",
            contract.proposal.id,
            contract
                .signed_at
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        )?;

        Ok(Document {
            filename: attachment_filename(&signer.company, contract.signed_at, "txt"),
            content_type: "text/plain; charset=utf-8",
            bytes: text.into_bytes(),
        })
    }
}

/// `Contract_<Company_with_underscores>_<YYYY-MM-DD>.<extension>`
#[must_use]
pub fn attachment_filename(
    company: &str,
    signed_at: chrono::DateTime<chrono::Utc>,
    extension: &str,
) -> String {
    let company = company.split_whitespace().collect::<Vec<_>>().join("_");
    format!(
        "Contract_{company}_{}.{extension}",
        signed_at.format("%Y-%m-%d")
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{contract::tests::submission, proposals};
    use chrono::TimeZone;

    #[test]
    fn filename_collapses_whitespace() {
        let signed_at = chrono::Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(
            attachment_filename("Acme  Medical\tBoard", signed_at, "txt"),
            "Contract_Acme_Medical_Board_2025-03-07.txt"
        );
    }

    #[test]
    fn text_contract_carries_audit_trail() -> Result<()> {
        let signer = submission().signer()?;
        let proposal = proposals::get("adb").ok_or_else(|| anyhow::anyhow!("adb missing"))?;
        let signed_at = chrono::Utc.with_ymd_and_hms(2025, 3, 7, 12, 30, 0).unwrap();

        let document = TextContractRenderer.render(&SignedContract {
            proposal,
            signer: &signer,
            client_ip: "203.0.113.9",
            signed_at,
        })?;

        assert_eq!(
            document.filename,
            "Contract_Acme_Medical_Board_2025-03-07.txt"
        );
        let text = String::from_utf8(document.bytes)?;
        assert!(text.starts_with("PATIENT SIMULATION TRAINING SYSTEM AGREEMENT"));
        assert!(text.contains("electronically signed by Jane Doe"));
        assert!(text.contains("Title: Director at Acme Medical Board"));
        assert!(text.contains("IP Address: 203.0.113.9"));
        assert!(text.contains("ELECTRONIC SIGNATURE AUDIT TRAIL"));
        assert!(text.contains("2025-03-07T12:30:00.000Z"));
        Ok(())
    }
}
