//! Authentication modules, one per strategy kind.
//!
//! Every module follows the same state machine:
//! `Idle -> Attempting -> Succeeded | Failed`. The identity provider module
//! adds `AwaitingExternalCompletion` between `login` (which asks the caller to
//! open a web redirect) and `finish_login` (which exchanges the token the
//! redirect delivered).
//!
//! `AuthModule` is a flat enum so dispatch is checked exhaustively by the
//! compiler; there is no trait object hierarchy.
//!
//! Network work and its side effects are split. `run_login` and `run_finish`
//! only talk to the server and hand back an [`Attempt`]; the session store and
//! the module state change only when that attempt is committed. A watchdog that
//! wins the race simply drops the attempt, so a late response never installs a
//! session.

mod idp;
mod offline;
mod password;

pub use idp::IdpAuth;
pub use offline::OfflineAuth;
pub use password::{LdapAuth, LocalAuth};

use super::{
    client::AuthClient,
    error::AuthError,
    messages::{user_message, AuthFlow},
    params::{ExternalCompletion, LoginParameters},
    session::{Session, SessionStore},
    strategy::StrategyKind,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use serde_json::{json, Value};
use url::Url;

pub const DEVICE_PENDING_MESSAGE: &str =
    "Your device has been registered. An administrator must approve it before you can sign in.";

/// Result status reported to the login UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthenticationStatus {
    Success,
    Error,
    UnableToAuthenticate,
    RegistrationSuccess,
    AccountCreationSuccess,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginOutcome {
    pub status: AuthenticationStatus,
    pub message: Option<String>,
}

impl LoginOutcome {
    #[must_use]
    pub const fn new(status: AuthenticationStatus, message: Option<String>) -> Self {
        Self { status, message }
    }

    #[must_use]
    pub const fn success() -> Self {
        Self::new(AuthenticationStatus::Success, None)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AuthenticationStatus::Error, Some(message.into()))
    }

    /// Projects an error for `flow`. Transport failures become
    /// `UnableToAuthenticate` so the caller can offer offline login;
    /// cancellation carries no message.
    #[must_use]
    pub fn from_error(error: &AuthError, flow: AuthFlow) -> Self {
        let status = if error.is_transport() {
            AuthenticationStatus::UnableToAuthenticate
        } else {
            AuthenticationStatus::Error
        };
        let message = (!error.is_silent()).then(|| user_message(error, flow));
        Self::new(status, message)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == AuthenticationStatus::Success
    }
}

/// What `login` asks the caller to do next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginStep {
    Complete(LoginOutcome),
    /// Open this URL; call `finish_login` once the provider redirects back.
    Redirect(Url),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    Attempting,
    AwaitingExternalCompletion,
    Succeeded,
    Failed,
}

#[derive(Debug)]
pub(crate) struct StateCell(Mutex<LoginState>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(LoginState::Idle))
    }

    pub(crate) fn get(&self) -> LoginState {
        *self.0.lock()
    }

    pub(crate) fn set(&self, state: LoginState) {
        *self.0.lock() = state;
    }

    /// Moves to `Succeeded` or `Failed` according to `outcome`.
    pub(crate) fn settle(&self, outcome: &LoginOutcome) {
        self.set(if outcome.is_success() {
            LoginState::Succeeded
        } else {
            LoginState::Failed
        });
    }

    /// Moves from `from` to `to` atomically. Returns false if the state was
    /// something else.
    pub(crate) fn transition(&self, from: LoginState, to: LoginState) -> bool {
        let mut state = self.0.lock();
        if *state != from {
            return false;
        }
        *state = to;
        true
    }

    /// Marks an in-flight attempt as failed; settled states are kept.
    pub(crate) fn abandon(&self) {
        let mut state = self.0.lock();
        if matches!(
            *state,
            LoginState::Attempting | LoginState::AwaitingExternalCompletion
        ) {
            *state = LoginState::Failed;
        }
    }
}

/// A finished network exchange whose side effects have not been applied.
#[derive(Debug)]
pub(crate) struct Attempt<T> {
    value: T,
    session: Option<Session>,
}

impl<T> Attempt<T> {
    pub(crate) const fn new(value: T, session: Option<Session>) -> Self {
        Self { value, session }
    }

    pub(crate) const fn done(value: T) -> Self {
        Self::new(value, None)
    }

    pub(crate) fn map<U>(self, f: impl FnOnce(T) -> U) -> Attempt<U> {
        Attempt::new(f(self.value), self.session)
    }
}

impl Attempt<LoginOutcome> {
    /// Installs the session, if any, and settles the module state.
    pub(crate) fn apply(self, cell: &StateCell, sessions: &dyn SessionStore) -> LoginOutcome {
        if let Some(session) = self.session {
            sessions.replace(session);
        }
        cell.settle(&self.value);
        self.value
    }
}

impl Attempt<LoginStep> {
    pub(crate) fn apply(self, cell: &StateCell, sessions: &dyn SessionStore) -> LoginStep {
        match self.value {
            LoginStep::Complete(outcome) => {
                LoginStep::Complete(Attempt::new(outcome, self.session).apply(cell, sessions))
            }
            LoginStep::Redirect(url) => {
                cell.set(LoginState::AwaitingExternalCompletion);
                LoginStep::Redirect(url)
            }
        }
    }
}

const NOT_EXTERNAL_MESSAGE: &str = "This sign-in method does not use an external provider.";

pub enum AuthModule {
    Local(LocalAuth),
    Ldap(LdapAuth),
    Offline(OfflineAuth),
    Idp(IdpAuth),
}

impl AuthModule {
    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::Local(_) => StrategyKind::Local,
            Self::Ldap(_) => StrategyKind::Ldap,
            Self::Offline(_) => StrategyKind::Offline,
            Self::Idp(_) => StrategyKind::Idp,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Local(module) => module.title(),
            Self::Ldap(module) => module.title(),
            Self::Offline(module) => module.title(),
            Self::Idp(module) => module.title(),
        }
    }

    #[must_use]
    pub fn state(&self) -> LoginState {
        self.cell().get()
    }

    /// Starts a login. Always completes exactly once with a step.
    pub async fn login(&self, params: &LoginParameters) -> LoginStep {
        self.begin_login();
        let attempt = self.run_login(params).await;
        self.commit_step(attempt)
    }

    /// Completes an external sign-in. Only identity providers support this;
    /// every other kind reports an error.
    pub async fn finish_login(&self, completion: ExternalCompletion) -> LoginOutcome {
        if let Err(outcome) = self.begin_finish() {
            return outcome;
        }
        let attempt = self.run_finish(completion).await;
        self.commit_outcome(attempt)
    }

    /// Gives up on an in-flight attempt (timeout or cancellation).
    pub fn abandon(&self) {
        self.cell().abandon();
    }

    pub(crate) fn begin_login(&self) {
        self.cell().set(LoginState::Attempting);
    }

    /// Talks to the server without touching the session store or the state.
    pub(crate) async fn run_login(&self, params: &LoginParameters) -> Attempt<LoginStep> {
        match self {
            Self::Local(module) => module.run(params).await,
            Self::Ldap(module) => module.run(params).await,
            Self::Offline(module) => module.run(params).await,
            Self::Idp(module) => module.run(params),
        }
    }

    pub(crate) fn begin_finish(&self) -> Result<(), LoginOutcome> {
        match self {
            Self::Idp(module) => module.begin_finish(),
            Self::Local(_) | Self::Ldap(_) | Self::Offline(_) => {
                Err(LoginOutcome::error(NOT_EXTERNAL_MESSAGE))
            }
        }
    }

    pub(crate) async fn run_finish(&self, completion: ExternalCompletion) -> Attempt<LoginOutcome> {
        match self {
            Self::Idp(module) => module.run_finish(completion).await,
            Self::Local(_) | Self::Ldap(_) | Self::Offline(_) => {
                Attempt::done(LoginOutcome::error(NOT_EXTERNAL_MESSAGE))
            }
        }
    }

    pub(crate) fn commit_step(&self, attempt: Attempt<LoginStep>) -> LoginStep {
        attempt.apply(self.cell(), self.sessions())
    }

    pub(crate) fn commit_outcome(&self, attempt: Attempt<LoginOutcome>) -> LoginOutcome {
        attempt.apply(self.cell(), self.sessions())
    }

    fn cell(&self) -> &StateCell {
        match self {
            Self::Local(module) => module.cell(),
            Self::Ldap(module) => module.cell(),
            Self::Offline(module) => module.cell(),
            Self::Idp(module) => module.cell(),
        }
    }

    fn sessions(&self) -> &dyn SessionStore {
        match self {
            Self::Local(module) => module.sessions(),
            Self::Ldap(module) => module.sessions(),
            Self::Offline(module) => module.sessions(),
            Self::Idp(module) => module.sessions(),
        }
    }
}

/// Result of exchanging a signin token for a device-bound session.
#[derive(Debug)]
pub(crate) enum Authorization {
    Authorized(Session),
    DeviceNeedsApproval,
}

/// Exchanges a signin token for an API session via `/auth/token`.
///
/// A 403 means the device is registered but not yet approved.
pub(crate) async fn authorize(
    client: &AuthClient,
    token: &SecretString,
    kind: StrategyKind,
) -> Result<Authorization, AuthError> {
    let config = client.config();
    let body = json!({
        "uid": config.device_uid,
        "appVersion": config.app_version,
    });

    let response = client
        .execute(
            Method::POST,
            "/auth/token?createDevice=false",
            Some(&body),
            Some(token),
        )
        .await?;

    if response.status == StatusCode::FORBIDDEN {
        return Ok(Authorization::DeviceNeedsApproval);
    }

    let value = response.into_json()?;
    parse_session(&value, kind).map(Authorization::Authorized)
}

/// Builds a session from an `/auth/token` response.
pub(crate) fn parse_session(value: &Value, kind: StrategyKind) -> Result<Session, AuthError> {
    let token = value
        .get("token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MalformedResponse)?;

    let expires_at = match value.get("expirationDate").and_then(Value::as_str) {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|_| AuthError::MalformedResponse)?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(Session {
        token: SecretString::from(token.to_string()),
        expires_at,
        user: value.get("user").cloned(),
        strategy: kind,
    })
}

/// Converts an authorization result into the outcome the UI sees, carrying
/// the session to install when the attempt is committed.
pub(crate) fn authorization_outcome(result: Result<Authorization, AuthError>) -> Attempt<LoginOutcome> {
    match result {
        Ok(Authorization::Authorized(session)) => Attempt::new(LoginOutcome::success(), Some(session)),
        Ok(Authorization::DeviceNeedsApproval) => Attempt::done(LoginOutcome::new(
            AuthenticationStatus::RegistrationSuccess,
            Some(DEVICE_PENDING_MESSAGE.to_string()),
        )),
        Err(err) => Attempt::done(LoginOutcome::from_error(&err, AuthFlow::Login)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::error::{TransportError, TransportKind};
    use crate::auth::session::MemorySessionStore;

    #[test]
    fn outcome_from_transport_error_is_unable_to_authenticate() {
        let err = AuthError::Network(TransportError::of_kind(
            "reqwest",
            TransportKind::NotConnected,
            "connection refused",
        ));
        let outcome = LoginOutcome::from_error(&err, AuthFlow::Login);
        assert_eq!(outcome.status, AuthenticationStatus::UnableToAuthenticate);
        assert!(outcome.message.is_some());
    }

    #[test]
    fn outcome_from_cancel_has_no_message() {
        let outcome = LoginOutcome::from_error(&AuthError::Cancelled, AuthFlow::Login);
        assert_eq!(outcome.status, AuthenticationStatus::Error);
        assert_eq!(outcome.message, None);
    }

    #[test]
    fn parse_session_reads_token_expiry_and_user() {
        let session = parse_session(
            &json!({
                "token": "abc",
                "expirationDate": "2030-01-01T00:00:00.000Z",
                "user": { "username": "alice" }
            }),
            StrategyKind::Local,
        )
        .unwrap();

        assert_eq!(session.username(), Some("alice"));
        assert!(session.expires_at.is_some());
        assert_eq!(session.strategy, StrategyKind::Local);
    }

    #[test]
    fn parse_session_rejects_missing_token_or_bad_date() {
        assert_eq!(
            parse_session(&json!({}), StrategyKind::Local).unwrap_err(),
            AuthError::MalformedResponse
        );
        assert_eq!(
            parse_session(
                &json!({ "token": "abc", "expirationDate": "tomorrow" }),
                StrategyKind::Local
            )
            .unwrap_err(),
            AuthError::MalformedResponse
        );
    }

    #[test]
    fn device_pending_is_registration_success() {
        let sessions = MemorySessionStore::new();
        let cell = StateCell::new();
        let outcome = authorization_outcome(Ok(Authorization::DeviceNeedsApproval)).apply(&cell, &sessions);
        assert_eq!(outcome.status, AuthenticationStatus::RegistrationSuccess);
        assert!(sessions.current().is_none());
        assert_eq!(cell.get(), LoginState::Failed);
    }

    #[test]
    fn authorized_session_is_installed_only_on_apply() {
        let sessions = MemorySessionStore::new();
        let cell = StateCell::new();
        cell.set(LoginState::Attempting);

        let session = parse_session(&json!({ "token": "abc" }), StrategyKind::Local).unwrap();
        let attempt = authorization_outcome(Ok(Authorization::Authorized(session)));
        assert!(sessions.current().is_none());
        assert_eq!(cell.get(), LoginState::Attempting);

        assert!(attempt.apply(&cell, &sessions).is_success());
        assert!(sessions.current().is_some());
        assert_eq!(cell.get(), LoginState::Succeeded);
    }

    #[test]
    fn state_cell_transition_requires_expected_state() {
        let cell = StateCell::new();
        assert!(!cell.transition(LoginState::AwaitingExternalCompletion, LoginState::Attempting));
        assert_eq!(cell.get(), LoginState::Idle);

        cell.set(LoginState::AwaitingExternalCompletion);
        assert!(cell.transition(LoginState::AwaitingExternalCompletion, LoginState::Attempting));
        assert_eq!(cell.get(), LoginState::Attempting);
    }

    #[test]
    fn state_cell_abandon_only_touches_in_flight_states() {
        let cell = StateCell::new();
        cell.abandon();
        assert_eq!(cell.get(), LoginState::Idle);

        cell.set(LoginState::Attempting);
        cell.abandon();
        assert_eq!(cell.get(), LoginState::Failed);

        cell.set(LoginState::Succeeded);
        cell.abandon();
        assert_eq!(cell.get(), LoginState::Succeeded);
    }
}
