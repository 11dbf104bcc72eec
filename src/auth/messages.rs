//! User-facing text for authentication errors.
//!
//! The same error can read differently depending on the flow the user is in:
//! a 401 during a password change means the *current* password was wrong.

use super::error::{AuthError, TransportError, TransportKind};

/// Where the error surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthFlow {
    Login,
    Signup,
    ChangePassword,
    Generic,
}

/// One message per `(error, flow)` pair. Cancellation yields an empty string;
/// check [`AuthError::is_silent`] before showing anything.
#[must_use]
pub fn user_message(error: &AuthError, flow: AuthFlow) -> String {
    match error {
        AuthError::InvalidCredentials => match flow {
            AuthFlow::ChangePassword => "Current password is incorrect.".to_string(),
            AuthFlow::Signup => "Signup was rejected. Check the information you entered.".to_string(),
            AuthFlow::Login | AuthFlow::Generic => "Unauthorized. Check your credentials.".to_string(),
        },
        AuthError::AccountDisabled => {
            "Your account is disabled or locked. Contact your MAGE administrator.".to_string()
        }
        AuthError::Cancelled => String::new(),
        AuthError::MalformedResponse => {
            "The server sent an unexpected response. Please try again.".to_string()
        }
        AuthError::Configuration => {
            "This app is not configured correctly. Please contact support.".to_string()
        }
        AuthError::Network(transport) => network_message(transport),
        AuthError::Server { status, message } => message
            .clone()
            .unwrap_or_else(|| format!("Server error ({status}). Please try again later.")),
        AuthError::RateLimited {
            retry_after_seconds,
        } => match retry_after_seconds {
            Some(seconds) => format!("Too many attempts. Try again in {seconds} seconds."),
            None => "Too many attempts. Please wait and try again.".to_string(),
        },
        AuthError::InvalidInput { message } => message.clone().unwrap_or_else(|| {
            match flow {
                AuthFlow::Signup => "Please check the information you entered.",
                AuthFlow::ChangePassword => "The new password was rejected.",
                AuthFlow::Login | AuthFlow::Generic => "Invalid request.",
            }
            .to_string()
        }),
        AuthError::PolicyViolation { message } => message.clone().unwrap_or_else(|| {
            match flow {
                AuthFlow::Signup => "That username is not available.",
                AuthFlow::ChangePassword => "The new password does not meet the password policy.",
                AuthFlow::Login | AuthFlow::Generic => "The request conflicts with existing data.",
            }
            .to_string()
        }),
    }
}

/// Friendly text for common transport failures; anything else keeps the
/// transport's own description.
#[must_use]
pub fn network_message(transport: &TransportError) -> String {
    match transport.kind() {
        TransportKind::NotConnected => {
            "You appear to be offline. Check your connection and try again.".to_string()
        }
        TransportKind::TimedOut => "The request timed out. Please try again.".to_string(),
        TransportKind::HostUnreachable => {
            "The server could not be found. Check the server URL.".to_string()
        }
        TransportKind::Tls => {
            "A secure connection to the server could not be established.".to_string()
        }
        TransportKind::Other => transport.description().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_depends_on_flow() {
        let err = AuthError::InvalidCredentials;
        assert_eq!(
            user_message(&err, AuthFlow::ChangePassword),
            "Current password is incorrect."
        );
        assert_eq!(
            user_message(&err, AuthFlow::Login),
            "Unauthorized. Check your credentials."
        );
        assert_eq!(
            user_message(&err, AuthFlow::Generic),
            "Unauthorized. Check your credentials."
        );
    }

    #[test]
    fn server_message_is_preferred() {
        let err = AuthError::PolicyViolation {
            message: Some("Username is not available".to_string()),
        };
        assert_eq!(user_message(&err, AuthFlow::Signup), "Username is not available");

        let bare = AuthError::PolicyViolation { message: None };
        assert_eq!(
            user_message(&bare, AuthFlow::Signup),
            "That username is not available."
        );

        let server = AuthError::Server {
            status: 502,
            message: None,
        };
        assert!(user_message(&server, AuthFlow::Login).contains("502"));
    }

    #[test]
    fn rate_limit_mentions_retry_delay() {
        let err = AuthError::RateLimited {
            retry_after_seconds: Some(30),
        };
        assert_eq!(
            user_message(&err, AuthFlow::Login),
            "Too many attempts. Try again in 30 seconds."
        );
    }

    #[test]
    fn transport_kinds_have_distinct_messages() {
        let kinds = [
            TransportKind::NotConnected,
            TransportKind::TimedOut,
            TransportKind::HostUnreachable,
            TransportKind::Tls,
        ];
        let messages: Vec<String> = kinds
            .iter()
            .map(|kind| network_message(&TransportError::of_kind("reqwest", *kind, "raw")))
            .collect();

        for (index, message) in messages.iter().enumerate() {
            assert!(!messages[index + 1..].contains(message));
        }

        let other = TransportError::of_kind("reqwest", TransportKind::Other, "builder error");
        assert_eq!(network_message(&other), "builder error");
    }

    #[test]
    fn cancelled_is_empty_and_configuration_mentions_support() {
        assert!(user_message(&AuthError::Cancelled, AuthFlow::Login).is_empty());
        assert!(user_message(&AuthError::Configuration, AuthFlow::Generic).contains("support"));
    }
}
