//! Composition root for the authentication core.
//!
//! Owns the HTTP client and the two stores every module needs. Build one per
//! server; clones share the same collaborators.

use super::{
    client::{AuthClient, ClientConfig},
    credentials::{CredentialStore, MemoryCredentialStore},
    error::AuthError,
    session::{MemorySessionStore, SessionStore},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthContext {
    client: Arc<AuthClient>,
    sessions: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialStore>,
}

impl AuthContext {
    #[must_use]
    pub fn new(
        client: AuthClient,
        sessions: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            client: Arc::new(client),
            sessions,
            credentials,
        }
    }

    /// Context backed by in-memory stores.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the HTTP client cannot be built.
    pub fn in_memory(config: ClientConfig) -> Result<Self, AuthError> {
        Ok(Self::new(
            AuthClient::new(config)?,
            Arc::new(MemorySessionStore::new()),
            Arc::new(MemoryCredentialStore::new()),
        ))
    }

    #[must_use]
    pub fn client(&self) -> &Arc<AuthClient> {
        &self.client
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    #[must_use]
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }
}
