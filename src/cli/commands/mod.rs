pub mod logging;
pub mod relay;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

fn mint() -> Command {
    let command = Command::new("mint")
        .about("Mint a relay link for a destination URL")
        .arg(
            Arg::new("credential")
                .short('c')
                .long("credential")
                .help("Bearer credential to relay")
                .env("AUTHRELAY_CREDENTIAL")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .help("Destination URL on the relying party")
                .required(true),
        )
        .arg(
            Arg::new("domain")
                .short('d')
                .long("domain")
                .help("Hostname of the issuing page, recorded in the token")
                .default_value("localhost")
                .env("AUTHRELAY_DOMAIN"),
        );

    relay::with_args(command)
}

fn inspect() -> Command {
    let command = Command::new("inspect")
        .about("Decode a relay token, or the token carried by a URL")
        .arg(
            Arg::new("input")
                .help("Encoded token or URL with the relay parameter")
                .required(true),
        );

    relay::with_args(command)
}

fn consume() -> Command {
    let command = Command::new("consume")
        .about("Consume a relay URL and hand the credential to a relying-party backend")
        .arg(
            Arg::new("url")
                .help("URL carrying the relay parameter")
                .required(true),
        )
        .arg(
            Arg::new("backend-url")
                .short('b')
                .long("backend-url")
                .help("Base URL of the relying-party backend, example: https://dashboard.tld")
                .env("AUTHRELAY_BACKEND_URL")
                .required(true),
        );

    relay::with_args(command)
}

fn server() -> Command {
    Command::new("server")
        .about("Run the relying-party verification backend")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("AUTHRELAY_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("upstream-url")
                .long("upstream-url")
                .help("Identity provider base URL, credentials are checked at <url>/verify")
                .env("AUTHRELAY_UPSTREAM_URL")
                .required(true),
        )
        .arg(
            Arg::new("roles")
                .long("roles")
                .help("Path to a JSON object mapping principal ids to roles")
                .env("AUTHRELAY_ROLES")
                .required(true),
        )
        .arg(
            Arg::new("required-role")
                .long("required-role")
                .help("Only accept principals holding this role")
                .env("AUTHRELAY_REQUIRED_ROLE"),
        )
}

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

    let command = Command::new("authrelay")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(mint())
        .subcommand(inspect())
        .subcommand(consume())
        .subcommand(server());

    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{DEFAULT_PARAM, DEFAULT_VALIDITY_WINDOW_MS};

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "authrelay");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        command.debug_assert();
    }

    #[test]
    fn test_mint_args() {
        temp_env::with_vars([("AUTHRELAY_CREDENTIAL", None::<String>)], || {
            let matches = new().get_matches_from(vec![
                "authrelay",
                "mint",
                "--credential",
                "abc",
                "--url",
                "https://b.example/admin",
                "--domain",
                "a.example",
            ]);
            let Some(("mint", sub)) = matches.subcommand() else {
                panic!("expected mint subcommand");
            };
            assert_eq!(sub.get_one::<String>("credential").cloned(), Some("abc".to_string()));
            assert_eq!(
                sub.get_one::<String>("url").cloned(),
                Some("https://b.example/admin".to_string())
            );
            assert_eq!(
                sub.get_one::<String>("domain").cloned(),
                Some("a.example".to_string())
            );
            assert_eq!(
                sub.get_one::<String>(relay::ARG_PARAM).map(String::as_str),
                Some(DEFAULT_PARAM)
            );
            assert_eq!(
                sub.get_one::<i64>(relay::ARG_WINDOW_MS).copied(),
                Some(DEFAULT_VALIDITY_WINDOW_MS)
            );
        });
    }

    #[test]
    fn test_mint_requires_credential() {
        temp_env::with_vars([("AUTHRELAY_CREDENTIAL", None::<String>)], || {
            let result = new().try_get_matches_from(vec![
                "authrelay",
                "mint",
                "--url",
                "https://b.example/admin",
            ]);
            assert_eq!(
                result.map_err(|e| e.kind()).err(),
                Some(clap::error::ErrorKind::MissingRequiredArgument)
            );
        });
    }

    #[test]
    fn test_window_must_be_positive() {
        let result = new().try_get_matches_from(vec![
            "authrelay",
            "inspect",
            "token",
            "--window-ms",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("AUTHRELAY_PORT", Some("443")),
                ("AUTHRELAY_UPSTREAM_URL", Some("https://idp.tld")),
                ("AUTHRELAY_ROLES", Some("/etc/authrelay/roles.json")),
                ("AUTHRELAY_REQUIRED_ROLE", Some("admin")),
                ("AUTHRELAY_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["authrelay", "server"]);
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));

                let Some(("server", sub)) = matches.subcommand() else {
                    panic!("expected server subcommand");
                };
                assert_eq!(sub.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    sub.get_one::<String>("upstream-url").cloned(),
                    Some("https://idp.tld".to_string())
                );
                assert_eq!(
                    sub.get_one::<String>("roles").cloned(),
                    Some("/etc/authrelay/roles.json".to_string())
                );
                assert_eq!(
                    sub.get_one::<String>("required-role").cloned(),
                    Some("admin".to_string())
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("AUTHRELAY_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["authrelay", "inspect", "token"]);
                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("AUTHRELAY_LOG_LEVEL", None::<String>)], || {
                let mut args = vec![
                    "authrelay".to_string(),
                    "inspect".to_string(),
                    "token".to_string(),
                ];

                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }
}
