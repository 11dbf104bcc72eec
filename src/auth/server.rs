//! Server discovery: version and advertised authentication strategies.

use super::{
    client::AuthClient,
    error::AuthError,
    params::{ParamsError, StrategyRecord},
    policy::PasswordPolicy,
    strategy::AuthStrategy,
};
use serde_json::Value;
use tracing::{instrument, warn};

#[derive(Clone, Debug, PartialEq)]
pub struct ServerInfo {
    pub version: Option<String>,
    /// Sorted by identifier.
    pub strategies: Vec<StrategyRecord>,
}

impl ServerInfo {
    /// Parses the `/api` document. Strategy entries that cannot be parsed are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ParamsError::NotAnObject`] if the document or its
    /// `authenticationStrategies` member is not an object.
    pub fn from_value(value: &Value) -> Result<Self, ParamsError> {
        let object = value.as_object().ok_or(ParamsError::NotAnObject)?;

        let version = object.get("version").and_then(|version| match version {
            Value::String(text) => Some(text.clone()),
            Value::Object(parts) => {
                let part = |key: &str| parts.get(key).and_then(Value::as_u64).unwrap_or(0);
                Some(format!("{}.{}.{}", part("major"), part("minor"), part("micro")))
            }
            _ => None,
        });

        let mut strategies = Vec::new();
        match object.get("authenticationStrategies") {
            Some(Value::Object(entries)) => {
                for (identifier, entry) in entries {
                    match StrategyRecord::from_value(identifier, entry) {
                        Ok(record) => strategies.push(record),
                        Err(err) => warn!("skipping strategy {identifier}: {err}"),
                    }
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => return Err(ParamsError::NotAnObject),
        }
        strategies.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        Ok(Self {
            version,
            strategies,
        })
    }

    #[must_use]
    pub fn strategy(&self, identifier: &str) -> Option<&StrategyRecord> {
        self.strategies
            .iter()
            .find(|record| record.identifier.eq_ignore_ascii_case(identifier))
    }

    /// Policy of the local strategy, used for signup and password changes.
    #[must_use]
    pub fn local_policy(&self) -> Option<&PasswordPolicy> {
        self.strategies
            .iter()
            .find(|record| record.strategy() == AuthStrategy::Local)
            .and_then(|record| record.password_policy.as_ref())
    }
}

/// Fetches `GET /api`.
///
/// # Errors
///
/// Returns transport and HTTP errors, or [`AuthError::MalformedResponse`] if
/// the document has the wrong shape.
#[instrument(skip(client))]
pub async fn fetch_server_info(client: &AuthClient) -> Result<ServerInfo, AuthError> {
    let value = client.get_json("/api", None).await?;
    ServerInfo::from_value(&value).map_err(|_| AuthError::MalformedResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::client::ClientConfig;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn document() -> Value {
        json!({
            "version": { "major": 6, "minor": 2, "micro": 1 },
            "authenticationStrategies": {
                "local": {
                    "passwordPolicy": {
                        "passwordMinLengthEnabled": true,
                        "passwordMinLength": 12
                    }
                },
                "google": { "title": "Google", "type": "oauth" },
                "broken": "not an object"
            }
        })
    }

    #[test]
    fn parses_version_and_strategies() {
        let info = ServerInfo::from_value(&document()).unwrap();

        assert_eq!(info.version.as_deref(), Some("6.2.1"));
        let identifiers: Vec<&str> = info
            .strategies
            .iter()
            .map(|record| record.identifier.as_str())
            .collect();
        assert_eq!(identifiers, ["google", "local"]);
        assert_eq!(info.strategy("GOOGLE").unwrap().title.as_deref(), Some("Google"));
        assert_eq!(info.local_policy().unwrap().min_length.threshold, 12);
    }

    #[test]
    fn rejects_non_object_documents() {
        assert_eq!(
            ServerInfo::from_value(&json!([])),
            Err(ParamsError::NotAnObject)
        );
        assert_eq!(
            ServerInfo::from_value(&json!({ "authenticationStrategies": [] })),
            Err(ParamsError::NotAnObject)
        );
    }

    #[tokio::test]
    async fn fetches_api_document() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document()))
            .mount(&server)
            .await;

        let client = AuthClient::new(ClientConfig::new(&server.uri(), "device-1").unwrap()).unwrap();
        let info = fetch_server_info(&client).await.unwrap();
        assert_eq!(info.strategies.len(), 2);
    }
}
