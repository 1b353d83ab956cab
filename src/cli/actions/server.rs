use crate::{api, api::state::VoiceConfig};
use anyhow::Result;
use secrecy::SecretString;
use std::time::Duration;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub session_secret: SecretString,
    pub public_base_url: String,
    pub default_resource: String,
    pub max_attempts: u32,
    pub attempt_window: Duration,
    pub cooldown: Duration,
    pub abuse_max_requests: u32,
    pub abuse_window: Duration,
    pub voice: VoiceConfig,
    pub mail_from: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    api::new(args).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("public_base_url", args.public_base_url.clone()),
        ("default_resource", args.default_resource.clone()),
        (
            "attempts",
            format!(
                "{} per {}s, cooldown {}s",
                args.max_attempts,
                args.attempt_window.as_secs(),
                args.cooldown.as_secs()
            ),
        ),
        (
            "abuse_limit",
            format!(
                "{} per {}s",
                args.abuse_max_requests,
                args.abuse_window.as_secs()
            ),
        ),
        (
            "voice",
            if args.voice.agent_id().is_some() && args.voice.api_key().is_some() {
                args.voice.api_url().to_string()
            } else {
                "disabled".to_string()
            },
        ),
        (
            "mail_from",
            args.mail_from
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\nStartup configuration:", banner());
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn banner() -> String {
    let hash = crate::GIT_COMMIT_HASH.trim();
    let short_hash = hash.get(..7).unwrap_or(hash);
    format!(
        "G A T E H O U S E - {} - {}",
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
}
