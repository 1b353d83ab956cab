use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_LOG_LEVEL: &str = "log-level";

/// Level names accepted in `GATEHOUSE_LOG_LEVEL`, in `-v` count order.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a `-v` count (0-5) or a level name from `GATEHOUSE_LOG_LEVEL`.
#[must_use]
pub fn log_level_parser() -> ValueParser {
    ValueParser::from(|raw: &str| -> Result<u8, String> {
        let raw = raw.trim();
        if let Ok(count) = raw.parse::<u8>() {
            return if count <= 5 {
                Ok(count)
            } else {
                Err(format!("log level count {count} is above 5"))
            };
        }

        LEVEL_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(raw))
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("unknown log level '{raw}', expected one of {LEVEL_NAMES:?}"))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_LOG_LEVEL)
            .short('v')
            .long("verbose")
            .help("Log more: -v warn, -vv info (gate decisions), -vvv debug, -vvvv trace. Errors only by default")
            .env("GATEHOUSE_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(log_level_parser()),
    )
}
