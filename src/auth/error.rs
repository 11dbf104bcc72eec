//! Closed taxonomy of authentication failures.
//!
//! Exactly one variant describes each failed HTTP outcome; success is the
//! absence of an error. Transport failures keep their `(domain, code)` class so
//! two independently produced failures of the same class compare equal.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

pub const REQWEST_DOMAIN: &str = "reqwest";

/// Coarse classification of transport failures, used for friendly messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportKind {
    NotConnected,
    TimedOut,
    HostUnreachable,
    Tls,
    Other,
}

impl TransportKind {
    /// Stable numeric code for the kind, shared by every transport domain.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::NotConnected => -1009,
            Self::TimedOut => -1001,
            Self::HostUnreachable => -1003,
            Self::Tls => -1200,
            Self::Other => -1,
        }
    }
}

/// A wrapped transport failure.
///
/// Equality only looks at `domain` and `code`; the kind and description are
/// informational.
#[derive(Clone, Debug)]
pub struct TransportError {
    domain: String,
    code: i64,
    kind: TransportKind,
    description: String,
}

impl TransportError {
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        code: i64,
        kind: TransportKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            code,
            kind,
            description: description.into(),
        }
    }

    /// Builds a transport error whose code is derived from its kind.
    #[must_use]
    pub fn of_kind(domain: impl Into<String>, kind: TransportKind, description: impl Into<String>) -> Self {
        Self::new(domain, kind.code(), kind, description)
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub const fn code(&self) -> i64 {
        self.code
    }

    #[must_use]
    pub const fn kind(&self) -> TransportKind {
        self.kind
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for TransportError {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.code == other.code
    }
}

impl Eq for TransportError {}

impl fmt::Display for TransportError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} ({}:{})", self.description, self.domain, self.code)
    }
}

impl From<&reqwest::Error> for TransportError {
    fn from(err: &reqwest::Error) -> Self {
        let kind = classify_reqwest(err);
        Self::of_kind(REQWEST_DOMAIN, kind, err.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::from(&err)
    }
}

fn classify_reqwest(err: &reqwest::Error) -> TransportKind {
    if err.is_timeout() {
        return TransportKind::TimedOut;
    }
    if !err.is_connect() {
        return TransportKind::Other;
    }

    let chain = source_chain(err).to_lowercase();
    if chain.contains("certificate") || chain.contains("tls") || chain.contains("ssl") {
        TransportKind::Tls
    } else if chain.contains("dns") || chain.contains("resolve") || chain.contains("lookup") {
        TransportKind::HostUnreachable
    } else {
        TransportKind::NotConnected
    }
}

fn source_chain(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        text.push_str(": ");
        text.push_str(&source.to_string());
        current = source.source();
    }
    text
}

/// Every way an authentication attempt can fail.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account disabled")]
    AccountDisabled,
    #[error("cancelled")]
    Cancelled,
    #[error("malformed response")]
    MalformedResponse,
    #[error("configuration error")]
    Configuration,
    #[error("network error: {0}")]
    Network(TransportError),
    #[error("server error ({status})")]
    Server { status: u16, message: Option<String> },
    #[error("rate limited")]
    RateLimited { retry_after_seconds: Option<u64> },
    #[error("invalid input")]
    InvalidInput { message: Option<String> },
    #[error("policy violation")]
    PolicyViolation { message: Option<String> },
}

impl AuthError {
    /// Cancellation is user initiated and should not surface a message.
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True when the server could not be reached at all.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::MalformedResponse;
        }
        if err.is_builder() {
            return Self::Configuration;
        }
        Self::Network(TransportError::from(&err))
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(_: serde_json::Error) -> Self {
        Self::MalformedResponse
    }
}

impl From<url::ParseError> for AuthError {
    fn from(_: url::ParseError) -> Self {
        Self::Configuration
    }
}
