use crate::{
    auth::{fetch_server_info, AuthClient, ServerInfo},
    cli::globals::GlobalArgs,
};
use anyhow::{Context, Result};
use std::fmt::Write;

/// Print the strategies the server advertises.
/// # Errors
/// Returns an error if the server cannot be reached or its answer is not understood.
pub async fn execute(globals: GlobalArgs) -> Result<()> {
    let client = AuthClient::new(globals.client_config()?)?;
    let info = fetch_server_info(&client)
        .await
        .context("could not fetch server information")?;

    print!("{}", render(&info));
    Ok(())
}

fn render(info: &ServerInfo) -> String {
    let mut out = String::new();
    if let Some(version) = &info.version {
        let _ = writeln!(out, "server version: {version}");
    }

    for record in &info.strategies {
        let strategy = record.strategy();
        let _ = write!(
            out,
            "{:<16} {:<8} {}",
            record.identifier,
            strategy.kind(),
            record.title.as_deref().unwrap_or("-")
        );
        if let Some(policy) = &record.password_policy {
            if policy.min_length.enabled {
                let _ = write!(out, " (min length {})", policy.min_length.threshold);
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render() {
        let info = ServerInfo::from_value(&json!({
            "version": "6.2.1",
            "authenticationStrategies": {
                "local": {
                    "title": "Username/Password",
                    "passwordPolicy": { "passwordMinLengthEnabled": true, "passwordMinLength": 14 }
                },
                "geoaxis": {}
            }
        }))
        .unwrap();

        let text = render(&info);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "server version: 6.2.1");
        assert!(lines[1].starts_with("geoaxis"));
        assert!(lines[1].contains("idp"));
        assert!(lines[2].contains("Username/Password (min length 14)"));
    }
}
