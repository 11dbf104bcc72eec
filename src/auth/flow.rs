//! Login orchestration on top of the modules.
//!
//! Runs each attempt under the watchdog, keeps offline credentials fresh after
//! online password logins and owns logout.

use super::{
    attempt::{attempt_finish_login, attempt_login, Cancellation},
    client::DEFAULT_TIMEOUT,
    context::AuthContext,
    messages::AuthFlow,
    factory::make_for_record,
    module::{AuthModule, LoginOutcome, LoginStep},
    params::{ExternalCompletion, LoginParameters, ParamsError, StrategyRecord},
    session::Session,
    strategy::StrategyKind,
};
use chrono::Utc;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct LoginFlow {
    ctx: AuthContext,
    timeout: Duration,
}

impl LoginFlow {
    #[must_use]
    pub fn new(ctx: AuthContext) -> Self {
        Self {
            ctx,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Watchdog budget for one attempt.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn context(&self) -> &AuthContext {
        &self.ctx
    }

    /// Logs in with `module`. Timeouts and cancellation are reported through
    /// the outcome; a cancelled attempt carries no message.
    #[instrument(skip(self, module, params, cancel), fields(strategy = %module.kind()))]
    pub async fn login(
        &self,
        module: Arc<AuthModule>,
        params: LoginParameters,
        cancel: &Cancellation,
    ) -> LoginStep {
        let kind = module.kind();
        let username = params.username.clone();
        let password = params.password.clone();

        let step = match attempt_login(module, params, self.timeout, cancel).await {
            Ok(step) => step,
            Err(err) => {
                warn!("login attempt did not complete: {err}");
                LoginStep::Complete(LoginOutcome::from_error(&err, AuthFlow::Login))
            }
        };

        if matches!(kind, StrategyKind::Local | StrategyKind::Ldap)
            && matches!(&step, LoginStep::Complete(outcome) if outcome.is_success())
        {
            let credentials = Arc::clone(self.ctx.credentials());
            let saved = tokio::task::spawn_blocking(move || credentials.save(&username, &password)).await;
            match saved {
                Ok(Ok(())) => info!("offline credentials updated"),
                Ok(Err(err)) => warn!("could not save offline credentials: {err}"),
                Err(err) => warn!("offline credential task failed: {err}"),
            }
        }

        step
    }

    /// Completes an identity provider login after the redirect.
    pub async fn finish_login(
        &self,
        module: Arc<AuthModule>,
        completion: ExternalCompletion,
        cancel: &Cancellation,
    ) -> LoginOutcome {
        match attempt_finish_login(module, completion, self.timeout, cancel).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("finish login did not complete: {err}");
                LoginOutcome::from_error(&err, AuthFlow::Login)
            }
        }
    }

    /// Module for the client-side offline strategy, which servers never list.
    ///
    /// # Errors
    ///
    /// Returns [`ParamsError`] if the offline record cannot be parsed.
    pub fn offline_module(&self) -> Result<AuthModule, ParamsError> {
        make_for_record(&StrategyRecord::offline(), &self.ctx)
    }

    /// Whether `username` can sign in with the offline strategy.
    #[must_use]
    pub fn offline_available(&self, username: &str) -> bool {
        self.ctx.credentials().contains(username)
    }

    /// The current session, if it has not expired. An expired session is
    /// cleared so it is never presented to the server.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        let session = self.ctx.sessions().current()?;
        if session.is_expired(Utc::now()) {
            info!("session expired");
            self.ctx.sessions().clear();
            return None;
        }
        Some(session)
    }

    /// Clears the current session and tells the server, best effort.
    /// Offline sessions never reach the server.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Option<Session> {
        let session = self.ctx.sessions().clear()?;

        if !session.is_offline() {
            if let Err(err) = self
                .ctx
                .client()
                .post_json("/api/logout", &json!({}), Some(&session.token))
                .await
            {
                warn!("server logout failed: {err}");
            }
        }

        info!("logged out");
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        client::ClientConfig,
        factory::make_module,
        module::{AuthenticationStatus, LoginState},
    };
    use secrecy::SecretString;
    use std::net::TcpListener;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn flow(uri: &str) -> LoginFlow {
        let config = ClientConfig::new(uri, "device-1").unwrap();
        LoginFlow::new(AuthContext::in_memory(config).unwrap())
    }

    fn module(flow: &LoginFlow, identifier: &str) -> Arc<AuthModule> {
        let record = StrategyRecord::from_value(identifier, &json!({})).unwrap();
        Arc::new(make_module(identifier, &record, flow.context()).unwrap())
    }

    #[tokio::test]
    async fn online_login_enables_offline_login() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/local/signin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "t1" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "api-token",
                "user": { "username": "alice" }
            })))
            .mount(&server)
            .await;

        let flow = flow(&server.uri());
        let cancel = Cancellation::new();
        assert!(!flow.offline_available("alice"));

        let step = flow
            .login(
                module(&flow, "local"),
                LoginParameters::new("alice", "secret"),
                &cancel,
            )
            .await;
        assert_eq!(step, LoginStep::Complete(LoginOutcome::success()));
        assert!(flow.offline_available("alice"));

        flow.context().sessions().clear();
        let offline = flow
            .login(
                Arc::new(flow.offline_module().unwrap()),
                LoginParameters::new("alice", "secret"),
                &cancel,
            )
            .await;
        assert_eq!(offline, LoginStep::Complete(LoginOutcome::success()));
        assert!(flow.context().sessions().current().unwrap().is_offline());
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/local/signin"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let flow = flow(&server.uri()).with_timeout(Duration::from_millis(100));
        let module = module(&flow, "local");
        let step = flow
            .login(
                Arc::clone(&module),
                LoginParameters::new("alice", "secret"),
                &Cancellation::new(),
            )
            .await;

        let LoginStep::Complete(outcome) = step else {
            panic!("local never redirects");
        };
        assert_eq!(outcome.status, AuthenticationStatus::UnableToAuthenticate);
        assert_eq!(
            outcome.message.as_deref(),
            Some("The request timed out. Please try again.")
        );
        assert!(!flow.offline_available("alice"));
    }

    #[tokio::test]
    async fn cancelled_login_is_silent() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/local/signin"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "token": "t1" }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let flow = flow(&server.uri());
        let module = module(&flow, "local");
        let cancel = Cancellation::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let step = flow
            .login(
                Arc::clone(&module),
                LoginParameters::new("alice", "secret"),
                &cancel,
            )
            .await;

        assert_eq!(
            step,
            LoginStep::Complete(LoginOutcome::new(AuthenticationStatus::Error, None))
        );
        assert_eq!(module.state(), LoginState::Failed);
        assert!(flow.context().sessions().current().is_none());
        assert!(!flow.offline_available("alice"));
    }

    #[test]
    fn expired_session_is_cleared() {
        let flow = flow("https://mage.example.com");
        let session = |expires_at| Session {
            token: SecretString::from("api-token".to_string()),
            expires_at,
            user: None,
            strategy: StrategyKind::Local,
        };

        flow.context()
            .sessions()
            .replace(session(Some(Utc::now() + chrono::Duration::hours(1))));
        assert!(flow.current_session().is_some());

        flow.context()
            .sessions()
            .replace(session(Some(Utc::now() - chrono::Duration::seconds(1))));
        assert!(flow.current_session().is_none());
        assert!(flow.context().sessions().current().is_none());
    }

    #[tokio::test]
    async fn logout_clears_session_and_notifies_server() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/logout"))
            .and(header("authorization", "Bearer api-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let flow = flow(&server.uri());
        flow.context().sessions().replace(Session {
            token: SecretString::from("api-token".to_string()),
            expires_at: None,
            user: None,
            strategy: StrategyKind::Local,
        });

        assert!(flow.logout().await.is_some());
        assert!(flow.context().sessions().current().is_none());
        assert!(flow.logout().await.is_none());
    }
}
