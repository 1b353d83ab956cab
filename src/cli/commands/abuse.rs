use clap::{Arg, Command};

pub const ARG_ABUSE_MAX_REQUESTS: &str = "abuse-max-requests";
pub const ARG_ABUSE_WINDOW: &str = "abuse-window-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ABUSE_MAX_REQUESTS)
                .long(ARG_ABUSE_MAX_REQUESTS)
                .help("Requests per client per window before answering 429")
                .default_value("120")
                .env("GATEHOUSE_ABUSE_MAX_REQUESTS")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_ABUSE_WINDOW)
                .long(ARG_ABUSE_WINDOW)
                .help("Length of the request window in seconds")
                .default_value("60")
                .env("GATEHOUSE_ABUSE_WINDOW_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
