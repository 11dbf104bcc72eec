use crate::{
    auth::{
        attempt::Cancellation,
        fetch_server_info, make_for_record, AuthContext, AuthenticationStatus, ExternalCompletion,
        LoginFlow, LoginOutcome, LoginParameters, LoginStep,
    },
    cli::globals::GlobalArgs,
};
use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub strategy: String,
    pub username: String,
    pub password: SecretString,
    pub idp_token: Option<SecretString>,
}

/// Run one login attempt and print the outcome. Ctrl-C cancels the attempt.
/// # Errors
/// Returns an error if the strategy is unknown to the server or the login
/// does not succeed.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.globals.client_config()?;
    let ctx = AuthContext::in_memory(config)?;
    let flow = LoginFlow::new(ctx.clone()).with_timeout(args.globals.timeout);

    check_strategy(&args.strategy)?;
    let info = fetch_server_info(ctx.client())
        .await
        .context("could not fetch server information")?;
    let record = info
        .strategy(&args.strategy)
        .cloned()
        .with_context(|| format!("server does not offer strategy: {}", args.strategy))?;

    let module = Arc::new(make_for_record(&record, &ctx)?);
    info!("signing in with {} ({})", module.title(), module.kind());

    let cancel = Cancellation::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupted");
            on_interrupt.cancel();
        }
    });

    let params = LoginParameters {
        username: args.username,
        password: args.password,
    };
    let step = flow.login(Arc::clone(&module), params, &cancel).await;

    let outcome = match step {
        LoginStep::Complete(outcome) => outcome,
        LoginStep::Redirect(url) => match args.idp_token {
            Some(token) => {
                let completion = ExternalCompletion::new(token.expose_secret());
                flow.finish_login(module, completion, &cancel).await
            }
            None => {
                interrupt.abort();
                println!("Open this URL to continue, then rerun with --idp-token:\n{url}");
                return Ok(());
            }
        },
    };
    interrupt.abort();

    report(&outcome)?;

    if let Some(session) = flow.current_session() {
        println!(
            "signed in as {}",
            session.username().unwrap_or("<unknown user>")
        );
        if let Some(expires_at) = session.expires_at {
            println!("session expires {}", expires_at.to_rfc3339());
        }
    }

    Ok(())
}

/// Offline credentials live in memory for the life of one process, so a
/// single CLI invocation never has any to check against.
fn check_strategy(strategy: &str) -> Result<()> {
    if strategy.trim().eq_ignore_ascii_case("offline") {
        bail!("offline sign-in needs credentials saved by an earlier online login in the same process; use an online strategy");
    }
    Ok(())
}

fn report(outcome: &LoginOutcome) -> Result<()> {
    let message = outcome.message.as_deref().unwrap_or_default();
    match outcome.status {
        AuthenticationStatus::Success
        | AuthenticationStatus::RegistrationSuccess
        | AuthenticationStatus::AccountCreationSuccess => {
            if !message.is_empty() {
                println!("{message}");
            }
            Ok(())
        }
        AuthenticationStatus::UnableToAuthenticate => {
            bail!("unable to authenticate: {message}")
        }
        AuthenticationStatus::Error if message.is_empty() => bail!("login cancelled"),
        AuthenticationStatus::Error => bail!("{message}"),
    }
}
