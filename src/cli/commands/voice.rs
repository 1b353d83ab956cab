use clap::{Arg, Command};

use crate::api::state::DEFAULT_VOICE_API_URL;

pub const ARG_VOICE_AGENT_ID: &str = "voice-agent-id";
pub const ARG_VOICE_API_KEY: &str = "voice-api-key";
pub const ARG_VOICE_API_URL: &str = "voice-api-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VOICE_AGENT_ID)
                .long(ARG_VOICE_AGENT_ID)
                .help("Conversational agent id")
                .env("GATEHOUSE_VOICE_AGENT_ID"),
        )
        .arg(
            Arg::new(ARG_VOICE_API_KEY)
                .long(ARG_VOICE_API_KEY)
                .help("API key for the voice service")
                .env("GATEHOUSE_VOICE_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_VOICE_API_URL)
                .long(ARG_VOICE_API_URL)
                .help("Base URL of the voice service")
                .default_value(DEFAULT_VOICE_API_URL)
                .env("GATEHOUSE_VOICE_API_URL"),
        )
}
