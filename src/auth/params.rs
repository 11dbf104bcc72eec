//! Typed strategy records and login parameters.
//!
//! Strategy records arrive as loosely typed JSON from the server. They are
//! parsed once here, at the boundary, into one parameter struct per strategy
//! kind so the modules never look keys up themselves.

use super::{policy::PasswordPolicy, strategy::AuthStrategy};
use secrecy::SecretString;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("strategy record must be a JSON object")]
    NotAnObject,
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// A strategy as advertised by the server.
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyRecord {
    pub identifier: String,
    pub title: Option<String>,
    pub kind: Option<String>,
    pub url: Option<Url>,
    pub password_policy: Option<PasswordPolicy>,
}

impl StrategyRecord {
    /// Parses one entry of the server's `authenticationStrategies` map.
    ///
    /// # Errors
    ///
    /// Returns an error when the record is not an object or when `url` is
    /// present but not a valid absolute URL.
    pub fn from_value(identifier: &str, value: &Value) -> Result<Self, ParamsError> {
        let object = value.as_object().ok_or(ParamsError::NotAnObject)?;

        let identifier = string_field(object, "identifier")
            .or_else(|| string_field(object, "name"))
            .unwrap_or_else(|| identifier.to_string());

        let url = match string_field(object, "url") {
            Some(raw) => Some(Url::parse(&raw).map_err(|err| ParamsError::InvalidField {
                field: "url",
                reason: err.to_string(),
            })?),
            None => None,
        };

        let password_policy = match object.get("passwordPolicy") {
            Some(Value::Object(config)) => Some(PasswordPolicy::from_config(config)),
            Some(Value::Null) | None => None,
            Some(_) => {
                return Err(ParamsError::InvalidField {
                    field: "passwordPolicy",
                    reason: "expected an object".to_string(),
                })
            }
        };

        Ok(Self {
            identifier,
            title: string_field(object, "title"),
            kind: string_field(object, "type"),
            url,
            password_policy,
        })
    }

    /// Record for the client-side offline strategy, which the server never lists.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            identifier: "offline".to_string(),
            title: Some("Offline".to_string()),
            kind: Some("offline".to_string()),
            url: None,
            password_policy: None,
        }
    }

    /// Strategy used for classification: the record's `type` wins over its
    /// identifier, since servers name federated strategies freely.
    #[must_use]
    pub fn strategy(&self) -> AuthStrategy {
        let local_kind = self
            .kind
            .as_deref()
            .map(|kind| AuthStrategy::from_raw(Some(kind)))
            .filter(|strategy| strategy.uses_password());

        match local_kind {
            Some(strategy) => strategy,
            None => AuthStrategy::from_raw(Some(&self.identifier)),
        }
    }

    fn display_title(&self) -> String {
        self.title.clone().unwrap_or_else(|| self.identifier.clone())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LocalParams {
    pub title: String,
    pub password_policy: Option<PasswordPolicy>,
}

impl TryFrom<&StrategyRecord> for LocalParams {
    type Error = ParamsError;

    fn try_from(record: &StrategyRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            title: record.display_title(),
            password_policy: record.password_policy.clone(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LdapParams {
    pub title: String,
    /// Path segment used for `/auth/{segment}/signin`.
    pub segment: String,
}

impl TryFrom<&StrategyRecord> for LdapParams {
    type Error = ParamsError;

    fn try_from(record: &StrategyRecord) -> Result<Self, Self::Error> {
        let segment = non_empty(&record.identifier).ok_or(ParamsError::MissingField("identifier"))?;
        Ok(Self {
            title: record.display_title(),
            segment,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfflineParams {
    pub title: String,
}

impl TryFrom<&StrategyRecord> for OfflineParams {
    type Error = ParamsError;

    fn try_from(record: &StrategyRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            title: record.display_title(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdpParams {
    pub title: String,
    pub provider: String,
    pub url: Option<Url>,
}

impl TryFrom<&StrategyRecord> for IdpParams {
    type Error = ParamsError;

    fn try_from(record: &StrategyRecord) -> Result<Self, Self::Error> {
        let provider =
            non_empty(&record.identifier).ok_or(ParamsError::MissingField("identifier"))?;
        Ok(Self {
            title: record.display_title(),
            provider,
            url: record.url.clone(),
        })
    }
}

/// Credentials typed by the user. The password never leaves a `SecretString`
/// except when serialized into the signin request.
#[derive(Clone, Debug)]
pub struct LoginParameters {
    pub username: String,
    pub password: SecretString,
}

impl LoginParameters {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Token delivered by the identity provider redirect.
#[derive(Clone, Debug)]
pub struct ExternalCompletion {
    pub token: SecretString,
}

impl ExternalCompletion {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).and_then(non_empty)
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
