//! Password gate and session settings.

use clap::{Arg, Command};

pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_PUBLIC_BASE_URL: &str = "public-base-url";
pub const ARG_DEFAULT_RESOURCE: &str = "default-resource";
pub const ARG_MAX_ATTEMPTS: &str = "max-attempts";
pub const ARG_ATTEMPT_WINDOW: &str = "attempt-window-seconds";
pub const ARG_COOLDOWN: &str = "cooldown-seconds";
pub const ARG_MAIL_FROM: &str = "mail-from";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret the session cookie key is derived from")
                .env("GATEHOUSE_SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_PUBLIC_BASE_URL)
                .long(ARG_PUBLIC_BASE_URL)
                .help("Public URL of the site; https marks the session cookie Secure")
                .default_value("http://localhost:8080")
                .env("GATEHOUSE_PUBLIC_BASE_URL"),
        )
        .arg(
            Arg::new(ARG_DEFAULT_RESOURCE)
                .long(ARG_DEFAULT_RESOURCE)
                .help("Resource checked when the return URL names no proposal")
                .default_value("adb")
                .env("GATEHOUSE_DEFAULT_RESOURCE"),
        )
        .arg(
            Arg::new(ARG_MAX_ATTEMPTS)
                .long(ARG_MAX_ATTEMPTS)
                .help("Password attempts per window before the cooldown starts")
                .default_value("10")
                .env("GATEHOUSE_MAX_ATTEMPTS")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_ATTEMPT_WINDOW)
                .long(ARG_ATTEMPT_WINDOW)
                .help("Length of the attempt window in seconds")
                .default_value("900")
                .env("GATEHOUSE_ATTEMPT_WINDOW_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOLDOWN)
                .long(ARG_COOLDOWN)
                .help("Lockout after too many attempts, in seconds")
                .default_value("900")
                .env("GATEHOUSE_COOLDOWN_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_MAIL_FROM)
                .long(ARG_MAIL_FROM)
                .help("Sender address for signed contract emails; unset skips the email")
                .env("GATEHOUSE_MAIL_FROM"),
        )
}
