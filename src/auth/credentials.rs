//! Offline credential store.
//!
//! After a successful online login the password is kept as an argon2 hash so
//! the offline strategy can authenticate the same user without the server.
//! Raw passwords are never stored.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to hash credential: {0}")]
    Hash(String),
    #[error("stored credential is corrupt: {0}")]
    Corrupt(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialCheck {
    Match,
    Mismatch,
    Unknown,
}

pub trait CredentialStore: Send + Sync {
    /// Stores (or replaces) the credential for `username`.
    ///
    /// # Errors
    ///
    /// Returns an error if the password cannot be hashed.
    fn save(&self, username: &str, password: &SecretString) -> Result<(), StoreError>;

    /// Checks `password` against the stored credential for `username`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash cannot be parsed.
    fn verify(&self, username: &str, password: &SecretString) -> Result<CredentialCheck, StoreError>;

    fn contains(&self, username: &str) -> bool;

    fn remove(&self, username: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    hashes: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, username: &str, password: &SecretString) -> Result<(), StoreError> {
        let hash = hash_password(password)?;
        self.hashes.write().insert(normalize(username), hash);
        Ok(())
    }

    fn verify(&self, username: &str, password: &SecretString) -> Result<CredentialCheck, StoreError> {
        let Some(stored) = self.hashes.read().get(&normalize(username)).cloned() else {
            return Ok(CredentialCheck::Unknown);
        };

        let parsed = PasswordHash::new(&stored).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        let matches = Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok();

        Ok(if matches {
            CredentialCheck::Match
        } else {
            CredentialCheck::Mismatch
        })
    }

    fn contains(&self, username: &str) -> bool {
        self.hashes.read().contains_key(&normalize(username))
    }

    fn remove(&self, username: &str) -> bool {
        self.hashes.write().remove(&normalize(username)).is_some()
    }
}

fn hash_password(password: &SecretString) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| StoreError::Hash(err.to_string()))
}

fn normalize(username: &str) -> String {
    username.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn unknown_user_is_reported() {
        let store = MemoryCredentialStore::new();
        assert_eq!(
            store.verify("bob", &secret("pw")).unwrap(),
            CredentialCheck::Unknown
        );
    }

    #[test]
    fn saved_credentials_verify() {
        let store = MemoryCredentialStore::new();
        store.save("alice", &secret("correct horse")).unwrap();

        assert_eq!(
            store.verify(" alice ", &secret("correct horse")).unwrap(),
            CredentialCheck::Match
        );
        assert_eq!(
            store.verify("alice", &secret("battery staple")).unwrap(),
            CredentialCheck::Mismatch
        );
    }

    #[test]
    fn stored_value_is_not_the_password() {
        let store = MemoryCredentialStore::new();
        store.save("alice", &secret("hunter2")).unwrap();
        let stored = store.hashes.read().get("alice").cloned().unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(!stored.contains("hunter2"));
    }

    #[test]
    fn each_save_uses_a_fresh_salt() {
        let store = MemoryCredentialStore::new();
        store.save("alice", &secret("hunter2")).unwrap();
        let first = store.hashes.read().get("alice").cloned().unwrap();
        store.save("alice", &secret("hunter2")).unwrap();
        let second = store.hashes.read().get("alice").cloned().unwrap();

        assert_ne!(first, second);
        assert_eq!(
            store.verify("alice", &secret("hunter2")).unwrap(),
            CredentialCheck::Match
        );
    }

    #[test]
    fn remove_forgets_user() {
        let store = MemoryCredentialStore::new();
        store.save("alice", &secret("pw")).unwrap();
        assert!(store.remove("alice"));
        assert!(!store.remove("alice"));
        assert_eq!(
            store.verify("alice", &secret("pw")).unwrap(),
            CredentialCheck::Unknown
        );
    }
}
