//! Account maintenance: signup and password change.
//!
//! New passwords are checked against the local password policy first, so
//! obvious violations never reach the server.

use super::{
    context::AuthContext,
    error::AuthError,
    messages::{user_message, AuthFlow},
    module::{AuthenticationStatus, LoginOutcome},
    policy::PasswordPolicy,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, instrument, warn};

pub const ACCOUNT_CREATED_MESSAGE: &str =
    "Your account has been created. An administrator must activate it before you can sign in.";
pub const PASSWORD_CHANGED_MESSAGE: &str = "Your password has been changed. Please sign in again.";

#[derive(Clone, Debug)]
pub struct SignupRequest {
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: SecretString,
    pub password_confirm: SecretString,
}

#[derive(Clone, Debug)]
pub struct PasswordChange {
    pub current: SecretString,
    pub new: SecretString,
    pub confirm: SecretString,
}

/// Creates an account with `POST /api/users/signups`.
#[instrument(skip(ctx, request, policy), fields(username = %request.username))]
pub async fn signup(
    ctx: &AuthContext,
    request: &SignupRequest,
    policy: Option<&PasswordPolicy>,
) -> LoginOutcome {
    if let Err(err) = check_new_password(&request.password, &request.password_confirm, policy) {
        return LoginOutcome::from_error(&err, AuthFlow::Signup);
    }

    let body = json!({
        "username": request.username,
        "displayName": request.display_name,
        "email": request.email,
        "phone": request.phone,
        "password": request.password.expose_secret(),
        "passwordconfirm": request.password_confirm.expose_secret(),
    });

    match ctx.client().post_json("/api/users/signups", &body, None).await {
        Ok(_) => {
            info!("account created");
            LoginOutcome::new(
                AuthenticationStatus::AccountCreationSuccess,
                Some(ACCOUNT_CREATED_MESSAGE.to_string()),
            )
        }
        Err(err) => {
            warn!("signup failed: {err}");
            LoginOutcome::from_error(&err, AuthFlow::Signup)
        }
    }
}

/// Changes the signed-in user's password with `PUT /api/users/myself/password`.
/// The session is cleared on success; the server revokes its token.
#[instrument(skip(ctx, change, policy))]
pub async fn change_password(
    ctx: &AuthContext,
    change: &PasswordChange,
    policy: Option<&PasswordPolicy>,
) -> LoginOutcome {
    if let Err(err) = check_new_password(&change.new, &change.confirm, policy) {
        return LoginOutcome::from_error(&err, AuthFlow::ChangePassword);
    }

    let Some(session) = ctx.sessions().current() else {
        return LoginOutcome::error("You must be signed in to change your password.");
    };
    if session.is_offline() {
        return LoginOutcome::error("Passwords cannot be changed while offline.");
    }

    let body = json!({
        "password": change.current.expose_secret(),
        "newPassword": change.new.expose_secret(),
        "newPasswordConfirm": change.confirm.expose_secret(),
    });

    match ctx
        .client()
        .put_json("/api/users/myself/password", &body, Some(&session.token))
        .await
    {
        Ok(_) => {
            ctx.sessions().clear();
            if let Some(username) = session.username() {
                ctx.credentials().remove(username);
            }
            info!("password changed");
            LoginOutcome::new(
                AuthenticationStatus::Success,
                Some(PASSWORD_CHANGED_MESSAGE.to_string()),
            )
        }
        Err(err) => {
            warn!("password change failed: {err}");
            LoginOutcome::new(
                AuthenticationStatus::Error,
                Some(user_message(&err, AuthFlow::ChangePassword)),
            )
        }
    }
}

fn check_new_password(
    password: &SecretString,
    confirm: &SecretString,
    policy: Option<&PasswordPolicy>,
) -> Result<(), AuthError> {
    if password.expose_secret() != confirm.expose_secret() {
        return Err(AuthError::InvalidInput {
            message: Some("Passwords do not match.".to_string()),
        });
    }

    if let Some(policy) = policy {
        let validation = policy.validate(password.expose_secret());
        if !validation.is_valid {
            return Err(AuthError::PolicyViolation {
                message: Some(validation.violations.join("\n")),
            });
        }
    }

    Ok(())
}
