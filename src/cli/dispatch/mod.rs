use crate::{
    api::state::VoiceConfig,
    cli::{
        actions::{server::Args, Action},
        commands::{abuse, gate, voice},
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let session_secret = matches
        .get_one::<String>(gate::ARG_SESSION_SECRET)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --session-secret")?;

    let string = |id: &str| matches.get_one::<String>(id).cloned();
    let seconds = |id: &str| matches.get_one::<u64>(id).copied().map(Duration::from_secs);

    let public_base_url = string(gate::ARG_PUBLIC_BASE_URL)
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    url::Url::parse(&public_base_url).context("invalid --public-base-url")?;

    let voice = VoiceConfig::new(
        string(voice::ARG_VOICE_AGENT_ID),
        string(voice::ARG_VOICE_API_KEY).map(SecretString::from),
        string(voice::ARG_VOICE_API_URL)
            .unwrap_or_else(|| crate::api::state::DEFAULT_VOICE_API_URL.to_string()),
    );

    Ok(Action::Server(Args {
        port,
        session_secret,
        public_base_url,
        default_resource: string(gate::ARG_DEFAULT_RESOURCE)
            .unwrap_or_else(|| crate::api::state::DEFAULT_RESOURCE.to_string()),
        max_attempts: matches
            .get_one::<u32>(gate::ARG_MAX_ATTEMPTS)
            .copied()
            .unwrap_or(10),
        attempt_window: seconds(gate::ARG_ATTEMPT_WINDOW).unwrap_or(Duration::from_secs(900)),
        cooldown: seconds(gate::ARG_COOLDOWN).unwrap_or(Duration::from_secs(900)),
        abuse_max_requests: matches
            .get_one::<u32>(abuse::ARG_ABUSE_MAX_REQUESTS)
            .copied()
            .unwrap_or(120),
        abuse_window: seconds(abuse::ARG_ABUSE_WINDOW).unwrap_or(Duration::from_secs(60)),
        voice,
        mail_from: string(gate::ARG_MAIL_FROM),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn builds_server_action() -> Result<()> {
        let matches = commands::new().try_get_matches_from(vec![
            "gatehouse",
            "--port",
            "9090",
            "--session-secret",
            "s3cret",
            "--public-base-url",
            "https://proposals.example.com",
            "--cooldown-seconds",
            "60",
            "--voice-agent-id",
            "agent-1",
            "--voice-api-url",
            "https://voice.example/",
        ])?;

        let Action::Server(args) = handler(&matches)?;
        assert_eq!(args.port, 9090);
        assert_eq!(args.session_secret.expose_secret(), "s3cret");
        assert_eq!(args.public_base_url, "https://proposals.example.com");
        assert_eq!(args.cooldown, Duration::from_secs(60));
        assert_eq!(args.attempt_window, Duration::from_secs(900));
        assert_eq!(args.voice.agent_id(), Some("agent-1"));
        assert_eq!(args.voice.api_url(), "https://voice.example");
        Ok(())
    }

    #[test]
    fn rejects_malformed_public_url() -> Result<()> {
        let matches = commands::new().try_get_matches_from(vec![
            "gatehouse",
            "--session-secret",
            "s3cret",
            "--public-base-url",
            "not a url",
        ])?;
        assert!(handler(&matches).is_err());
        Ok(())
    }
}
