//! Username/password modules: local accounts and LDAP.
//!
//! Both post credentials to `/auth/{segment}/signin` and then exchange the
//! returned token for a device-bound session.

use super::{authorization_outcome, authorize, Attempt, LoginState, LoginStep, StateCell};
use crate::auth::{
    client::AuthClient,
    error::AuthError,
    params::{LdapParams, LocalParams, LoginParameters},
    session::SessionStore,
    strategy::StrategyKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

struct PasswordSignin {
    client: Arc<AuthClient>,
    sessions: Arc<dyn SessionStore>,
    segment: String,
    kind: StrategyKind,
    state: StateCell,
}

impl PasswordSignin {
    fn new(
        client: Arc<AuthClient>,
        sessions: Arc<dyn SessionStore>,
        segment: String,
        kind: StrategyKind,
    ) -> Self {
        Self {
            client,
            sessions,
            segment,
            kind,
            state: StateCell::new(),
        }
    }

    async fn login(&self, params: &LoginParameters) -> LoginStep {
        self.state.set(LoginState::Attempting);
        self.run(params).await.apply(&self.state, self.sessions.as_ref())
    }

    #[instrument(skip(self, params), fields(strategy = %self.kind, username = %params.username))]
    async fn run(&self, params: &LoginParameters) -> Attempt<LoginStep> {
        let result = match self.signin(params).await {
            Ok(token) => authorize(&self.client, &token, self.kind).await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(_) => info!("credentials accepted"),
            Err(err) => warn!("login failed: {err}"),
        }

        authorization_outcome(result).map(LoginStep::Complete)
    }

    async fn signin(&self, params: &LoginParameters) -> Result<SecretString, AuthError> {
        let config = self.client.config();
        let body = json!({
            "username": params.username,
            "password": params.password.expose_secret(),
            "uid": config.device_uid,
            "appVersion": config.app_version,
        });

        let response = self
            .client
            .post_json(&format!("/auth/{}/signin", self.segment), &body, None)
            .await?;

        response
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(|token| SecretString::from(token.to_string()))
            .ok_or(AuthError::MalformedResponse)
    }
}

/// Local username/password accounts.
pub struct LocalAuth {
    params: LocalParams,
    signin: PasswordSignin,
}

impl LocalAuth {
    #[must_use]
    pub fn new(params: LocalParams, client: Arc<AuthClient>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            params,
            signin: PasswordSignin::new(client, sessions, "local".to_string(), StrategyKind::Local),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.params.title
    }

    pub async fn login(&self, params: &LoginParameters) -> LoginStep {
        self.signin.login(params).await
    }

    pub(crate) async fn run(&self, params: &LoginParameters) -> Attempt<LoginStep> {
        self.signin.run(params).await
    }

    pub(crate) fn cell(&self) -> &StateCell {
        &self.signin.state
    }

    pub(crate) fn sessions(&self) -> &dyn SessionStore {
        self.signin.sessions.as_ref()
    }
}

/// Directory-backed accounts.
pub struct LdapAuth {
    params: LdapParams,
    signin: PasswordSignin,
}

impl LdapAuth {
    #[must_use]
    pub fn new(params: LdapParams, client: Arc<AuthClient>, sessions: Arc<dyn SessionStore>) -> Self {
        let segment = params.segment.clone();
        Self {
            params,
            signin: PasswordSignin::new(client, sessions, segment, StrategyKind::Ldap),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.params.title
    }

    pub async fn login(&self, params: &LoginParameters) -> LoginStep {
        self.signin.login(params).await
    }

    pub(crate) async fn run(&self, params: &LoginParameters) -> Attempt<LoginStep> {
        self.signin.run(params).await
    }

    pub(crate) fn cell(&self) -> &StateCell {
        &self.signin.state
    }

    pub(crate) fn sessions(&self) -> &dyn SessionStore {
        self.signin.sessions.as_ref()
    }
}
