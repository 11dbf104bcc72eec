//! # mage-auth (MAGE authentication contract core)
//!
//! `mage-auth` turns heterogeneous MAGE server responses into a closed set of
//! authentication outcomes and drives the pluggable login strategies a server
//! advertises.
//!
//! ## Error contract
//!
//! Every HTTP outcome maps to at most one [`auth::AuthError`] variant. Success
//! is the absence of an error; anything the mapper does not recognize lands in
//! `Server { status, message }` so callers always match exhaustively.
//!
//! ## Strategies
//!
//! Servers advertise strategies by identifier (`local`, `ldap`, `google`,
//! `geoaxis`, ...). Identifiers resolve to one of four module kinds: local,
//! LDAP, offline and identity provider. Unknown identifiers resolve to the
//! identity provider so new federated providers still reach a web flow.
//!
//! ## Password policy
//!
//! Local accounts validate passwords against the policy published with the
//! strategy. Violations come back in a fixed order so every client renders
//! them the same way.
//!
//! ## Contract harness
//!
//! [`contract`] compares two HTTP implementations against the same fixtures
//! after JSON canonicalization (sorted keys, null object members dropped).

pub mod auth;
pub mod cli;
pub mod contract;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
