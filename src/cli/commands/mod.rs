pub mod logging;
pub mod server;

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

    let command = Command::new("mage-auth")
        .about("MAGE authentication client")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("strategies").about("List the authentication strategies a server offers"))
        .subcommand(
            Command::new("login")
                .about("Sign in with one of the server's strategies")
                .arg(
                    Arg::new("strategy")
                        .short('s')
                        .long("strategy")
                        .help("Strategy identifier, example: local, ldap, google (offline is not available here)")
                        .default_value("local"),
                )
                .arg(
                    Arg::new("username")
                        .long("username")
                        .help("Account username")
                        .env("MAGE_AUTH_USERNAME")
                        .required(true),
                )
                .arg(
                    Arg::new("password")
                        .long("password")
                        .help("Account password")
                        .env("MAGE_AUTH_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                )
                .arg(
                    Arg::new("idp-token")
                        .long("idp-token")
                        .help("Token delivered by the identity provider redirect"),
                ),
        )
        .subcommand(
            Command::new("check-password")
                .about("Validate a password against a password policy file")
                .arg(
                    Arg::new("policy")
                        .short('p')
                        .long("policy")
                        .help("JSON file holding a passwordPolicy object or a strategy record")
                        .required(true),
                )
                .arg(Arg::new("password").help("Candidate password").required(true)),
        )
        .subcommand(
            Command::new("canonicalize")
                .about("Print the canonical form of a JSON document")
                .arg(
                    Arg::new("file")
                        .help("JSON file, or - for stdin")
                        .default_value("-"),
                ),
        )
        .subcommand(
            Command::new("contract")
                .about("Compare two servers against a directory of fixtures")
                .arg(
                    Arg::new("fixtures")
                        .short('f')
                        .long("fixtures")
                        .help("Directory of fixture JSON files")
                        .required(true),
                )
                .arg(
                    Arg::new("legacy-url")
                        .long("legacy-url")
                        .help("Base URL of the reference server")
                        .env("MAGE_AUTH_LEGACY_URL")
                        .required(true),
                )
                .arg(
                    Arg::new("modern-url")
                        .long("modern-url")
                        .help("Base URL of the server under test")
                        .env("MAGE_AUTH_MODERN_URL")
                        .required(true),
                ),
        );

    let command = server::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "mage-auth");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "MAGE authentication client"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_login_args() {
        temp_env::with_vars(
            [
                ("MAGE_AUTH_URL", None::<&str>),
                ("MAGE_AUTH_PASSWORD", None),
                ("MAGE_AUTH_TIMEOUT", None),
            ],
            || {
                let matches = new().get_matches_from(vec![
                    "mage-auth",
                    "--url",
                    "https://mage.example.com",
                    "login",
                    "--strategy",
                    "ldap",
                    "--username",
                    "alice",
                    "--password",
                    "secret",
                ]);

                assert_eq!(
                    matches.get_one::<String>("url").map(String::as_str),
                    Some("https://mage.example.com")
                );
                assert_eq!(matches.get_one::<u64>("timeout").copied(), Some(30));

                let (name, login) = matches.subcommand().unwrap();
                assert_eq!(name, "login");
                assert_eq!(
                    login.get_one::<String>("strategy").map(String::as_str),
                    Some("ldap")
                );
                assert_eq!(
                    login.get_one::<String>("password").map(String::as_str),
                    Some("secret")
                );
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("MAGE_AUTH_URL", Some("https://mage.example.com")),
                ("MAGE_AUTH_TIMEOUT", Some("5")),
                ("MAGE_AUTH_DEVICE_UID", Some("device-1")),
                ("MAGE_AUTH_USERNAME", Some("alice")),
                ("MAGE_AUTH_PASSWORD", Some("secret")),
                ("MAGE_AUTH_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["mage-auth", "login"]);
                assert_eq!(matches.get_one::<u64>("timeout").copied(), Some(5));
                assert_eq!(
                    matches.get_one::<String>("device-uid").map(String::as_str),
                    Some("device-1")
                );
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));

                let login = matches.subcommand_matches("login").unwrap();
                assert_eq!(
                    login.get_one::<String>("username").map(String::as_str),
                    Some("alice")
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("MAGE_AUTH_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["mage-auth", "strategies"]);
                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(u8::try_from(index).unwrap())
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_u8 {
            temp_env::with_vars([("MAGE_AUTH_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["mage-auth".to_string(), "strategies".to_string()];
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(usize::from(index))));
                }

                let matches = new().get_matches_from(args);
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(index));
            });
        }
    }

    #[test]
    fn test_timeout_must_be_positive() {
        temp_env::with_vars([("MAGE_AUTH_TIMEOUT", None::<&str>)], || {
            let result = new().try_get_matches_from(vec!["mage-auth", "--timeout", "0", "strategies"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_contract_requires_urls() {
        temp_env::with_vars(
            [
                ("MAGE_AUTH_LEGACY_URL", None::<&str>),
                ("MAGE_AUTH_MODERN_URL", None),
            ],
            || {
                let result =
                    new().try_get_matches_from(vec!["mage-auth", "contract", "--fixtures", "tests"]);
                assert!(result.is_err());
            },
        );
    }
}
