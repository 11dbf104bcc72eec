//! Offline login against credentials saved by an earlier online login.

use super::{Attempt, AuthenticationStatus, LoginOutcome, LoginState, LoginStep, StateCell};
use crate::auth::{
    credentials::{CredentialCheck, CredentialStore},
    error::AuthError,
    messages::{user_message, AuthFlow},
    params::{LoginParameters, OfflineParams},
    session::{Session, SessionStore},
    strategy::StrategyKind,
};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const NO_OFFLINE_CREDENTIALS_MESSAGE: &str =
    "No offline credentials are saved for this user. Sign in online first.";

pub struct OfflineAuth {
    params: OfflineParams,
    sessions: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialStore>,
    state: StateCell,
}

impl OfflineAuth {
    #[must_use]
    pub fn new(
        params: OfflineParams,
        sessions: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            params,
            sessions,
            credentials,
            state: StateCell::new(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.params.title
    }

    pub async fn login(&self, params: &LoginParameters) -> LoginStep {
        self.state.set(LoginState::Attempting);
        self.run(params).await.apply(&self.state, self.sessions.as_ref())
    }

    #[instrument(skip(self, params), fields(username = %params.username))]
    pub(crate) async fn run(&self, params: &LoginParameters) -> Attempt<LoginStep> {
        // argon2 verification is CPU bound
        let credentials = Arc::clone(&self.credentials);
        let username = params.username.clone();
        let password = params.password.clone();
        let check = tokio::task::spawn_blocking(move || credentials.verify(&username, &password)).await;

        let attempt = match check {
            Ok(Ok(CredentialCheck::Match)) => {
                info!("offline credentials match");
                Attempt::new(
                    LoginOutcome::success(),
                    Some(Session {
                        token: SecretString::from(String::new()),
                        expires_at: None,
                        user: Some(json!({ "username": params.username })),
                        strategy: StrategyKind::Offline,
                    }),
                )
            }
            Ok(Ok(CredentialCheck::Mismatch)) => {
                warn!("offline password mismatch");
                Attempt::done(LoginOutcome::error(user_message(
                    &AuthError::InvalidCredentials,
                    AuthFlow::Login,
                )))
            }
            Ok(Ok(CredentialCheck::Unknown)) => Attempt::done(LoginOutcome::new(
                AuthenticationStatus::UnableToAuthenticate,
                Some(NO_OFFLINE_CREDENTIALS_MESSAGE.to_string()),
            )),
            Ok(Err(err)) => {
                error!("offline credential check failed: {err}");
                Attempt::done(LoginOutcome::error(err.to_string()))
            }
            Err(err) => {
                error!("offline credential task failed: {err}");
                Attempt::done(LoginOutcome::error("Offline sign-in failed."))
            }
        };

        attempt.map(LoginStep::Complete)
    }

    pub(crate) fn cell(&self) -> &StateCell {
        &self.state
    }

    pub(crate) fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }
}
