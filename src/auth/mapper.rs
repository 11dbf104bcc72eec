//! Pure mapping from a raw HTTP response to an optional [`AuthError`].
//!
//! The mapper looks at the status code first, then at the `Retry-After` header
//! for 429 and at a best-effort message extracted from the body for validation
//! failures. It never performs I/O.

use super::error::AuthError;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;

const RETRY_AFTER: &str = "retry-after";

/// Case-insensitive header lookup over whatever header container the caller has.
pub trait ResponseHeaders {
    fn header(&self, name: &str) -> Option<Value>;
}

impl ResponseHeaders for HeaderMap {
    fn header(&self, name: &str) -> Option<Value> {
        self.get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| Value::String(value.to_string()))
    }
}

impl ResponseHeaders for HashMap<String, Value> {
    fn header(&self, name: &str) -> Option<Value> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }
}

impl ResponseHeaders for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<Value> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| Value::String(value.clone()))
    }
}

/// Maps `(status, headers, body)` to an error, or `None` for 2xx.
#[must_use]
pub fn map_response<H>(status: u16, headers: &H, body: Option<&[u8]>) -> Option<AuthError>
where
    H: ResponseHeaders + ?Sized,
{
    match status {
        200..=299 => None,
        401 => Some(AuthError::InvalidCredentials),
        403 | 423 => Some(AuthError::AccountDisabled),
        429 => Some(AuthError::RateLimited {
            retry_after_seconds: headers.header(RETRY_AFTER).and_then(|v| retry_after_seconds(&v)),
        }),
        400 | 422 => Some(classify_validation(extract_message(body))),
        409 => Some(AuthError::PolicyViolation {
            message: extract_message(body),
        }),
        _ => Some(AuthError::Server {
            status,
            message: extract_message(body),
        }),
    }
}

fn classify_validation(message: Option<String>) -> AuthError {
    let lowered = message.as_deref().map(str::to_lowercase).unwrap_or_default();

    if lowered.contains("credential") || lowered.contains("password") {
        AuthError::InvalidCredentials
    } else if ["disabled", "locked", "inactive"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        AuthError::AccountDisabled
    } else {
        AuthError::InvalidInput { message }
    }
}

/// Parses a `Retry-After` value given as a decimal string or a JSON number.
fn retry_after_seconds(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Best-effort user-facing message from an error body.
///
/// JSON objects yield `message`, then `error`, then the first string found in
/// the `errors` object. Anything else is treated as plain UTF-8 text.
#[must_use]
pub fn extract_message(body: Option<&[u8]>) -> Option<String> {
    let bytes = body?;

    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        if let Value::Object(object) = &value {
            if let Some(message) = object.get("message").and_then(Value::as_str) {
                return Some(message.to_string());
            }
            if let Some(error) = object.get("error").and_then(Value::as_str) {
                return Some(error.to_string());
            }
            if let Some(Value::Object(errors)) = object.get("errors") {
                return errors.values().find_map(first_string);
            }
        }
        if let Value::String(text) = value {
            return non_empty(&text);
        }
        return None;
    }

    std::str::from_utf8(bytes).ok().and_then(non_empty)
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde_json::json;

    fn no_headers() -> HashMap<String, Value> {
        HashMap::new()
    }

    #[test]
    fn success_statuses_map_to_none() {
        for status in [200, 204, 299] {
            assert_eq!(map_response(status, &no_headers(), None), None);
        }
    }

    #[test]
    fn auth_statuses_map_to_fixed_variants() {
        assert_eq!(
            map_response(401, &no_headers(), None),
            Some(AuthError::InvalidCredentials)
        );
        assert_eq!(
            map_response(403, &no_headers(), None),
            Some(AuthError::AccountDisabled)
        );
        assert_eq!(
            map_response(423, &no_headers(), None),
            Some(AuthError::AccountDisabled)
        );
    }

    #[test]
    fn rate_limit_reads_retry_after_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from_static("30"));
        assert_eq!(
            map_response(429, &headers, None),
            Some(AuthError::RateLimited {
                retry_after_seconds: Some(30)
            })
        );

        let mut raw = HashMap::new();
        raw.insert("RETRY-AFTER".to_string(), json!(12));
        assert_eq!(
            map_response(429, &raw, None),
            Some(AuthError::RateLimited {
                retry_after_seconds: Some(12)
            })
        );
    }

    #[test]
    fn rate_limit_without_header_has_no_seconds() {
        assert_eq!(
            map_response(429, &no_headers(), None),
            Some(AuthError::RateLimited {
                retry_after_seconds: None
            })
        );

        let mut raw = HashMap::new();
        raw.insert("retry-after".to_string(), "soon".to_string());
        assert_eq!(
            map_response(429, &raw, None),
            Some(AuthError::RateLimited {
                retry_after_seconds: None
            })
        );
    }

    #[test]
    fn conflict_maps_to_policy_violation_with_message() {
        let body = br#"{"error":"Username is not available"}"#;
        assert_eq!(
            map_response(409, &no_headers(), Some(body)),
            Some(AuthError::PolicyViolation {
                message: Some("Username is not available".to_string())
            })
        );
    }

    #[test]
    fn validation_failures_are_classified_by_message() {
        let password = br#"{"message":"Invalid Password"}"#;
        assert_eq!(
            map_response(400, &no_headers(), Some(password)),
            Some(AuthError::InvalidCredentials)
        );

        let locked = br#"{"message":"Account is LOCKED"}"#;
        assert_eq!(
            map_response(422, &no_headers(), Some(locked)),
            Some(AuthError::AccountDisabled)
        );

        let other = br#"{"message":"email is malformed"}"#;
        assert_eq!(
            map_response(400, &no_headers(), Some(other)),
            Some(AuthError::InvalidInput {
                message: Some("email is malformed".to_string())
            })
        );

        assert_eq!(
            map_response(400, &no_headers(), None),
            Some(AuthError::InvalidInput { message: None })
        );
    }

    #[test]
    fn other_statuses_fall_through_to_server() {
        assert_eq!(
            map_response(500, &no_headers(), Some(b"boom")),
            Some(AuthError::Server {
                status: 500,
                message: Some("boom".to_string())
            })
        );
        assert_eq!(
            map_response(302, &no_headers(), None),
            Some(AuthError::Server {
                status: 302,
                message: None
            })
        );
    }

    #[test]
    fn extract_message_prefers_message_then_error_then_errors() {
        let both = br#"{"error":"second","message":"first"}"#;
        assert_eq!(extract_message(Some(both)).as_deref(), Some("first"));

        let errors = br#"{"errors":{"username":["is taken","too short"]}}"#;
        assert_eq!(extract_message(Some(errors)).as_deref(), Some("is taken"));

        let plain = br#"{"errors":{"email":"is required"}}"#;
        assert_eq!(extract_message(Some(plain)).as_deref(), Some("is required"));
    }

    #[test]
    fn extract_message_falls_back_to_text() {
        assert_eq!(
            extract_message(Some(b"  Unauthorized \n")).as_deref(),
            Some("Unauthorized")
        );
        assert_eq!(extract_message(Some(b"")), None);
        assert_eq!(extract_message(Some(br#"{"status":1}"#)), None);
        assert_eq!(extract_message(Some([0xff_u8, 0xfe].as_slice())), None);
        assert_eq!(extract_message(None), None);
    }
}
