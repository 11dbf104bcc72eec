//! Federated sign-in through an identity provider (Google, GeoAxis, SAML, ...).
//!
//! `login` only builds the provider URL; the caller opens it in a browser and
//! hands the token from the redirect back through `finish_login`.

use super::{
    authorization_outcome, authorize, Attempt, LoginOutcome, LoginState, LoginStep, StateCell,
};
use crate::auth::{
    client::AuthClient,
    error::AuthError,
    messages::AuthFlow,
    params::{ExternalCompletion, IdpParams, LoginParameters},
    session::SessionStore,
    strategy::StrategyKind,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;

pub struct IdpAuth {
    params: IdpParams,
    client: Arc<AuthClient>,
    sessions: Arc<dyn SessionStore>,
    state: StateCell,
}

impl IdpAuth {
    #[must_use]
    pub fn new(params: IdpParams, client: Arc<AuthClient>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            params,
            client,
            sessions,
            state: StateCell::new(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.params.title
    }

    /// URL the browser must open to start the provider sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the URL cannot be built.
    pub fn signin_url(&self) -> Result<Url, AuthError> {
        let mut url = self
            .client
            .endpoint(&format!("/auth/{}/signin", self.params.provider))?;
        url.query_pairs_mut()
            .append_pair("uid", &self.client.config().device_uid)
            .append_pair("state", "mobile");
        Ok(url)
    }

    /// Username and password are not used; the provider collects them.
    pub fn login(&self, params: &LoginParameters) -> LoginStep {
        self.state.set(LoginState::Attempting);
        self.run(params).apply(&self.state, self.sessions.as_ref())
    }

    #[instrument(skip(self, _params), fields(provider = %self.params.provider))]
    pub(crate) fn run(&self, _params: &LoginParameters) -> Attempt<LoginStep> {
        match self.signin_url() {
            Ok(url) => {
                info!("redirecting to identity provider");
                Attempt::done(LoginStep::Redirect(url))
            }
            Err(err) => Attempt::done(LoginStep::Complete(LoginOutcome::from_error(
                &err,
                AuthFlow::Login,
            ))),
        }
    }

    pub async fn finish_login(&self, completion: ExternalCompletion) -> LoginOutcome {
        if let Err(outcome) = self.begin_finish() {
            return outcome;
        }
        self.run_finish(completion)
            .await
            .apply(&self.state, self.sessions.as_ref())
    }

    /// Claims the pending redirect so only one completion can run.
    pub(crate) fn begin_finish(&self) -> Result<(), LoginOutcome> {
        if self
            .state
            .transition(LoginState::AwaitingExternalCompletion, LoginState::Attempting)
        {
            Ok(())
        } else {
            warn!("finish_login called without a pending redirect");
            Err(LoginOutcome::error(
                "No sign-in is waiting for the identity provider.",
            ))
        }
    }

    #[instrument(skip(self, completion), fields(provider = %self.params.provider))]
    pub(crate) async fn run_finish(&self, completion: ExternalCompletion) -> Attempt<LoginOutcome> {
        let result = authorize(&self.client, &completion.token, StrategyKind::Idp).await;
        if let Err(err) = &result {
            warn!("provider token exchange failed: {err}");
        }
        authorization_outcome(result)
    }

    pub(crate) fn cell(&self) -> &StateCell {
        &self.state
    }

    pub(crate) fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }
}
