//! Canonical classification of server strategy identifiers.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AuthStrategy {
    Local,
    Ldap,
    Offline,
    Idp { provider: Option<String> },
}

impl AuthStrategy {
    /// Classifies a raw identifier. Never fails: anything unknown, including an
    /// empty or missing identifier, is treated as an identity provider so the
    /// web redirect flow can still be attempted.
    #[must_use]
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Idp { provider: None };
        };

        match raw.trim().to_lowercase().as_str() {
            "local" | "userpass" | "usernamepassword" => Self::Local,
            "ldap" => Self::Ldap,
            "offline" => Self::Offline,
            _ => Self::Idp {
                provider: Some(raw.to_string()),
            },
        }
    }

    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::Local => StrategyKind::Local,
            Self::Ldap => StrategyKind::Ldap,
            Self::Offline => StrategyKind::Offline,
            Self::Idp { .. } => StrategyKind::Idp,
        }
    }

    /// Whether the strategy collects a username and password in the client.
    #[must_use]
    pub const fn uses_password(&self) -> bool {
        !matches!(self, Self::Idp { .. })
    }
}

/// Payload-free discriminant of [`AuthStrategy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Local,
    Ldap,
    Offline,
    Idp,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Ldap => "ldap",
            Self::Offline => "offline",
            Self::Idp => "idp",
        };
        formatter.pad(name)
    }
}
