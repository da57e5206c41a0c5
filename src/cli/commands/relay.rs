use crate::relay::DEFAULT_PARAM;
use clap::{Arg, Command};

pub const ARG_PARAM: &str = "param";
pub const ARG_WINDOW_MS: &str = "window-ms";

/// Relay settings shared by every command that mints or reads tokens.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PARAM)
                .long("param")
                .help("Query parameter carrying the relay token")
                .default_value(DEFAULT_PARAM)
                .env("AUTHRELAY_PARAM"),
        )
        .arg(
            Arg::new(ARG_WINDOW_MS)
                .long("window-ms")
                .help("Token validity window in milliseconds")
                .default_value("300000")
                .env("AUTHRELAY_WINDOW_MS")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
}
