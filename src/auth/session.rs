//! Process-wide "current session" collaborator.
//!
//! The store is injected into the modules through [`super::context::AuthContext`];
//! there is no global instance. Reads and writes are serialized by a
//! reader-writer lock: many readers, one writer.

use super::strategy::StrategyKind;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use secrecy::SecretString;
use serde_json::Value;

/// An authenticated session.
#[derive(Clone, Debug)]
pub struct Session {
    pub token: SecretString,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: Option<Value>,
    pub strategy: StrategyKind,
}

impl Session {
    /// Offline sessions carry no server token and never expire by themselves.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.strategy == StrategyKind::Offline
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|user| user.get("username"))
            .and_then(Value::as_str)
    }
}

pub trait SessionStore: Send + Sync {
    fn current(&self) -> Option<Session>;
    fn replace(&self, session: Session);
    fn clear(&self) -> Option<Session>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn current(&self) -> Option<Session> {
        self.session.read().clone()
    }

    fn replace(&self, session: Session) {
        *self.session.write() = Some(session);
    }

    fn clear(&self) -> Option<Session> {
        self.session.write().take()
    }
}
