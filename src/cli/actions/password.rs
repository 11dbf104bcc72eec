use crate::auth::PasswordPolicy;
use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::{fs, path::PathBuf};

#[derive(Debug)]
pub struct Args {
    pub policy: PathBuf,
    pub password: SecretString,
}

/// Validate a password against a policy file.
/// # Errors
/// Returns an error if the policy cannot be read or the password violates it.
pub fn execute(args: &Args) -> Result<()> {
    let text = fs::read_to_string(&args.policy)
        .with_context(|| format!("could not read {}", args.policy.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not JSON", args.policy.display()))?;
    let policy = policy_from_value(&value)?;

    let validation = policy.validate(args.password.expose_secret());
    if validation.is_valid {
        println!("password satisfies the policy");
        return Ok(());
    }

    for violation in &validation.violations {
        println!("- {violation}");
    }
    bail!("password violates {} rule(s)", validation.violations.len())
}

/// Accepts either a bare policy object or a strategy record carrying one
/// under `passwordPolicy`.
fn policy_from_value(value: &Value) -> Result<PasswordPolicy> {
    let object = value
        .get("passwordPolicy")
        .unwrap_or(value)
        .as_object()
        .context("password policy must be a JSON object")?;
    Ok(PasswordPolicy::from_config(object))
}
