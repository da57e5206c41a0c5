use crate::cli::{
    actions::{consume, inspect, mint, server, Action},
    commands::relay::{ARG_PARAM, ARG_WINDOW_MS},
};
use crate::relay::RelayConfig;
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::path::PathBuf;

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

fn relay_config(matches: &ArgMatches) -> RelayConfig {
    let mut config = RelayConfig::new();
    if let Some(param) = matches.get_one::<String>(ARG_PARAM) {
        config = config.with_param(param.clone());
    }
    if let Some(window_ms) = matches.get_one::<i64>(ARG_WINDOW_MS) {
        config = config.with_validity_window_ms(*window_ms);
    }
    config
}

/// # Errors
/// Returns an error if required arguments are missing or the subcommand is unknown.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("mint", sub)) => Ok(Action::Mint(mint::Args {
            credential: SecretString::from(required(sub, "credential")?),
            url: required(sub, "url")?,
            domain: required(sub, "domain")?,
            config: relay_config(sub),
        })),
        Some(("inspect", sub)) => Ok(Action::Inspect(inspect::Args {
            input: required(sub, "input")?,
            config: relay_config(sub),
        })),
        Some(("consume", sub)) => Ok(Action::Consume(consume::Args {
            url: required(sub, "url")?,
            backend_url: required(sub, "backend-url")?,
            config: relay_config(sub),
        })),
        Some(("server", sub)) => Ok(Action::Server(server::Args {
            port: sub.get_one::<u16>("port").copied().unwrap_or(8080),
            upstream_url: required(sub, "upstream-url")?,
            roles: PathBuf::from(required(sub, "roles")?),
            required_role: sub.get_one::<String>("required-role").cloned(),
        })),
        Some((name, _)) => Err(anyhow!("unknown command: {name}")),
        None => Err(anyhow!("no command given")),
    }
}
