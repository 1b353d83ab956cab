pub mod abuse;
pub mod gate;
pub mod logging;
pub mod voice;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("gatehouse")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("GATEHOUSE_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = gate::with_args(command);
    let command = abuse::with_args(command);
    let command = voice::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "gatehouse");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars([("GATEHOUSE_LOG_LEVEL", None::<String>)], || {
            let matches = new().get_matches_from(vec!["gatehouse", "--session-secret", "s3cret"]);

            assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
            assert_eq!(
                matches
                    .get_one::<String>(gate::ARG_PUBLIC_BASE_URL)
                    .map(String::as_str),
                Some("http://localhost:8080")
            );
            assert_eq!(
                matches
                    .get_one::<String>(gate::ARG_DEFAULT_RESOURCE)
                    .map(String::as_str),
                Some("adb")
            );
            assert_eq!(matches.get_one::<u32>(gate::ARG_MAX_ATTEMPTS).copied(), Some(10));
            assert_eq!(matches.get_one::<u64>(gate::ARG_ATTEMPT_WINDOW).copied(), Some(900));
            assert_eq!(matches.get_one::<u64>(gate::ARG_COOLDOWN).copied(), Some(900));
            assert_eq!(
                matches.get_one::<u32>(abuse::ARG_ABUSE_MAX_REQUESTS).copied(),
                Some(120)
            );
            assert_eq!(matches.get_one::<u64>(abuse::ARG_ABUSE_WINDOW).copied(), Some(60));
            assert_eq!(
                matches
                    .get_one::<String>(voice::ARG_VOICE_API_URL)
                    .map(String::as_str),
                Some("https://api.elevenlabs.io")
            );
            assert!(matches.get_one::<String>(gate::ARG_MAIL_FROM).is_none());
            assert_eq!(matches.get_one::<u8>(logging::ARG_LOG_LEVEL).copied(), Some(0));
        });
    }

    #[test]
    fn test_session_secret_is_required() {
        temp_env::with_vars([("GATEHOUSE_SESSION_SECRET", None::<String>)], || {
            let result = new().try_get_matches_from(vec!["gatehouse"]);
            assert_eq!(
                result.map_err(|e| e.kind()).err(),
                Some(clap::error::ErrorKind::MissingRequiredArgument)
            );
        });
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = new().try_get_matches_from(vec![
            "gatehouse",
            "--session-secret",
            "s3cret",
            "--max-attempts",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_PORT", Some("443")),
                ("GATEHOUSE_SESSION_SECRET", Some("from-env")),
                ("GATEHOUSE_PUBLIC_BASE_URL", Some("https://proposals.example.com")),
                ("GATEHOUSE_MAX_ATTEMPTS", Some("5")),
                ("GATEHOUSE_VOICE_AGENT_ID", Some("agent-1")),
                ("GATEHOUSE_MAIL_FROM", Some("sales@example.com")),
                ("GATEHOUSE_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["gatehouse"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches
                        .get_one::<String>(gate::ARG_SESSION_SECRET)
                        .map(String::as_str),
                    Some("from-env")
                );
                assert_eq!(
                    matches
                        .get_one::<String>(gate::ARG_PUBLIC_BASE_URL)
                        .map(String::as_str),
                    Some("https://proposals.example.com")
                );
                assert_eq!(matches.get_one::<u32>(gate::ARG_MAX_ATTEMPTS).copied(), Some(5));
                assert_eq!(
                    matches
                        .get_one::<String>(voice::ARG_VOICE_AGENT_ID)
                        .map(String::as_str),
                    Some("agent-1")
                );
                assert_eq!(
                    matches
                        .get_one::<String>(gate::ARG_MAIL_FROM)
                        .map(String::as_str),
                    Some("sales@example.com")
                );
                assert_eq!(matches.get_one::<u8>(logging::ARG_LOG_LEVEL).copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("GATEHOUSE_LOG_LEVEL", Some(level)),
                    ("GATEHOUSE_SESSION_SECRET", Some("s3cret")),
                ],
                || {
                    let matches = new().get_matches_from(vec!["gatehouse"]);
                    assert_eq!(
                        matches.get_one::<u8>(logging::ARG_LOG_LEVEL).copied(),
                        u8::try_from(index).ok()
                    );
                },
            );
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5usize {
            temp_env::with_vars([("GATEHOUSE_LOG_LEVEL", None::<String>)], || {
                let mut args = vec![
                    "gatehouse".to_string(),
                    "--session-secret".to_string(),
                    "s3cret".to_string(),
                ];

                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_LOG_LEVEL).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }
}
