//! Builds the module for a strategy advertised by the server.

use super::{
    context::AuthContext,
    module::{AuthModule, IdpAuth, LdapAuth, LocalAuth, OfflineAuth},
    params::{IdpParams, LdapParams, LocalParams, OfflineParams, ParamsError, StrategyRecord},
    strategy::AuthStrategy,
};
use std::sync::Arc;
use tracing::debug;

/// Builds the module for `strategy`, parsing `record` into that kind's
/// parameters. Identifiers nobody recognizes get an identity provider module.
///
/// # Errors
///
/// Returns [`ParamsError`] when `record` does not carry what the kind needs.
pub fn make_module(
    strategy: &str,
    record: &StrategyRecord,
    ctx: &AuthContext,
) -> Result<AuthModule, ParamsError> {
    build(AuthStrategy::from_raw(Some(strategy)), record, ctx)
}

/// Like [`make_module`], classifying by the record itself (its `type` first,
/// then its identifier).
///
/// # Errors
///
/// Returns [`ParamsError`] when `record` does not carry what the kind needs.
pub fn make_for_record(record: &StrategyRecord, ctx: &AuthContext) -> Result<AuthModule, ParamsError> {
    build(record.strategy(), record, ctx)
}

fn build(
    strategy: AuthStrategy,
    record: &StrategyRecord,
    ctx: &AuthContext,
) -> Result<AuthModule, ParamsError> {
    debug!("building {} module for {}", strategy.kind(), record.identifier);

    let client = Arc::clone(ctx.client());
    let sessions = Arc::clone(ctx.sessions());

    Ok(match strategy {
        AuthStrategy::Local => AuthModule::Local(LocalAuth::new(
            LocalParams::try_from(record)?,
            client,
            sessions,
        )),
        AuthStrategy::Ldap => {
            AuthModule::Ldap(LdapAuth::new(LdapParams::try_from(record)?, client, sessions))
        }
        AuthStrategy::Offline => AuthModule::Offline(OfflineAuth::new(
            OfflineParams::try_from(record)?,
            sessions,
            Arc::clone(ctx.credentials()),
        )),
        AuthStrategy::Idp { .. } => {
            AuthModule::Idp(IdpAuth::new(IdpParams::try_from(record)?, client, sessions))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{client::ClientConfig, strategy::StrategyKind};
    use serde_json::json;

    fn ctx() -> AuthContext {
        AuthContext::in_memory(ClientConfig::new("https://mage.example.com", "device-1").unwrap())
            .unwrap()
    }

    fn record(identifier: &str, value: serde_json::Value) -> StrategyRecord {
        StrategyRecord::from_value(identifier, &value).unwrap()
    }

    #[test]
    fn builds_each_kind() {
        let ctx = ctx();
        let cases = [
            ("local", StrategyKind::Local),
            ("ldap", StrategyKind::Ldap),
            ("offline", StrategyKind::Offline),
            ("google", StrategyKind::Idp),
        ];

        for (identifier, kind) in cases {
            let module = make_module(identifier, &record(identifier, json!({})), &ctx).unwrap();
            assert_eq!(module.kind(), kind, "{identifier}");
        }
    }

    #[test]
    fn unknown_identifier_builds_identity_provider() {
        let ctx = ctx();
        let module = make_module(
            "unknown-provider",
            &record("unknown-provider", json!({ "title": "Partner SSO" })),
            &ctx,
        )
        .unwrap();

        assert_eq!(module.kind(), StrategyKind::Idp);
        assert_eq!(module.title(), "Partner SSO");
    }

    #[test]
    fn record_type_wins_over_identifier() {
        let ctx = ctx();
        let module = make_for_record(
            &record("corp-directory", json!({ "type": "ldap", "title": "Corporate" })),
            &ctx,
        )
        .unwrap();
        assert_eq!(module.kind(), StrategyKind::Ldap);
    }

    #[test]
    fn unusable_record_is_a_params_error() {
        let ctx = ctx();
        let blank = StrategyRecord {
            identifier: "  ".to_string(),
            title: None,
            kind: None,
            url: None,
            password_policy: None,
        };
        assert!(matches!(
            make_module("ldap", &blank, &ctx),
            Err(ParamsError::MissingField("identifier"))
        ));
    }
}
