use crate::cli::{
    actions::{canonicalize, contract, login, password, Action},
    commands::server::{ARG_APP_VERSION, ARG_DEVICE_UID, ARG_TIMEOUT, ARG_URL},
    globals::GlobalArgs,
};
use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};
use uuid::Uuid;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let globals = globals(matches);

    let sub_m = |subcommand: &str| -> Result<&clap::ArgMatches> {
        matches
            .subcommand_matches(subcommand)
            .context("arguments not found")
    };

    let string = |m: &clap::ArgMatches, id: &str| -> Result<String> {
        m.get_one::<String>(id)
            .cloned()
            .with_context(|| format!("missing required argument: --{id}"))
    };

    match matches.subcommand_name() {
        Some("strategies") => Ok(Action::Strategies(globals)),
        Some("login") => {
            let m = sub_m("login")?;
            Ok(Action::Login(login::Args {
                globals,
                strategy: string(m, "strategy")?,
                username: string(m, "username")?,
                password: SecretString::from(string(m, "password")?),
                idp_token: m.get_one::<String>("idp-token").cloned().map(SecretString::from),
            }))
        }
        Some("check-password") => {
            let m = sub_m("check-password")?;
            Ok(Action::CheckPassword(password::Args {
                policy: PathBuf::from(string(m, "policy")?),
                password: SecretString::from(string(m, "password")?),
            }))
        }
        Some("canonicalize") => {
            let m = sub_m("canonicalize")?;
            let file = string(m, "file")?;
            Ok(Action::Canonicalize(canonicalize::Args {
                file: (file != "-").then(|| PathBuf::from(file)),
            }))
        }
        Some("contract") => {
            let m = sub_m("contract")?;
            Ok(Action::Contract(contract::Args {
                fixtures: PathBuf::from(string(m, "fixtures")?),
                legacy_url: string(m, "legacy-url")?,
                modern_url: string(m, "modern-url")?,
                timeout: globals.timeout,
            }))
        }
        Some(other) => bail!("unknown subcommand: {other}"),
        None => bail!("missing subcommand"),
    }
}

fn globals(matches: &clap::ArgMatches) -> GlobalArgs {
    GlobalArgs::new(
        matches.get_one::<String>(ARG_URL).cloned(),
        Duration::from_secs(matches.get_one::<u64>(ARG_TIMEOUT).copied().unwrap_or(30)),
        matches
            .get_one::<String>(ARG_APP_VERSION)
            .cloned()
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        matches
            .get_one::<String>(ARG_DEVICE_UID)
            .cloned()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
    )
}
