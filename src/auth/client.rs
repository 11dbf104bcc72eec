//! HTTP client for the MAGE authentication endpoints.
//!
//! Every request shares one `reqwest::Client` with the crate user agent and a
//! fixed timeout. Transport failures become [`AuthError::Network`], non-2xx
//! responses go through the mapper, and bodies that are not JSON become
//! [`AuthError::MalformedResponse`]. Tokens and passwords are only exposed when
//! written into a request.

use super::{error::AuthError, mapper::map_response};
use crate::APP_USER_AGENT;
use reqwest::{header::HeaderMap, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for one MAGE server.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub app_version: String,
    pub device_uid: String,
}

impl ClientConfig {
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] when `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(base_url: &str, device_uid: impl Into<String>) -> Result<Self, AuthError> {
        let base_url = Url::parse(base_url.trim())?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.host().is_none() {
            return Err(AuthError::Configuration);
        }

        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            device_uid: device_uid.into(),
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = app_version.into();
        self
    }
}

/// Status, headers and body of a response, before error mapping.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Maps non-2xx responses to an error and parses the body as JSON.
    /// An empty body parses as `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns the mapped error for non-2xx statuses, or
    /// [`AuthError::MalformedResponse`] when the body is not JSON.
    pub fn into_json(self) -> Result<Value, AuthError> {
        let status = self.status.as_u16();
        if let Some(err) = map_response(status, &self.headers, Some(self.body.as_slice())) {
            return Err(err);
        }
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[derive(Clone, Debug)]
pub struct AuthClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl AuthClient {
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|_| AuthError::Configuration)?;

        Ok(Self { config, http })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolves `path` (which may carry a query string) against the base URL,
    /// keeping any path prefix the base URL has.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        let base = self.config.base_url.as_str().trim_end_matches('/');
        let path = path.trim().trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Sends a request and returns the raw response without mapping errors.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Network`] on transport failures.
    #[instrument(skip(self, body, bearer), fields(base = %self.config.base_url))]
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        bearer: Option<&SecretString>,
    ) -> Result<RawResponse, AuthError> {
        let url = self.endpoint(path)?;
        let mut request: RequestBuilder = self.http.request(method, url);

        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        debug!("{} -> {}", path, status);

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// # Errors
    ///
    /// Returns transport, mapped HTTP or parse errors.
    pub async fn get_json(&self, path: &str, bearer: Option<&SecretString>) -> Result<Value, AuthError> {
        self.execute(Method::GET, path, None, bearer).await?.into_json()
    }

    /// # Errors
    ///
    /// Returns transport, mapped HTTP or parse errors.
    pub async fn post_json(
        &self,
        path: &str,
        body: &Value,
        bearer: Option<&SecretString>,
    ) -> Result<Value, AuthError> {
        self.execute(Method::POST, path, Some(body), bearer)
            .await?
            .into_json()
    }

    /// # Errors
    ///
    /// Returns transport, mapped HTTP or parse errors.
    pub async fn put_json(
        &self,
        path: &str,
        body: &Value,
        bearer: Option<&SecretString>,
    ) -> Result<Value, AuthError> {
        self.execute(Method::PUT, path, Some(body), bearer)
            .await?
            .into_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client(uri: &str) -> AuthClient {
        AuthClient::new(ClientConfig::new(uri, "device-1").unwrap()).unwrap()
    }

    #[test]
    fn config_rejects_non_http_urls() {
        assert_eq!(
            ClientConfig::new("not a url", "d").unwrap_err(),
            AuthError::Configuration
        );
        assert_eq!(
            ClientConfig::new("ftp://mage.example.com", "d").unwrap_err(),
            AuthError::Configuration
        );
        assert!(ClientConfig::new("https://mage.example.com", "d").is_ok());
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let client = client("https://mage.example.com/mage/");
        assert_eq!(
            client.endpoint("/auth/local/signin").unwrap().as_str(),
            "https://mage.example.com/mage/auth/local/signin"
        );
        assert_eq!(
            client
                .endpoint("auth/token?createDevice=false")
                .unwrap()
                .as_str(),
            "https://mage.example.com/mage/auth/token?createDevice=false"
        );
    }

    #[test]
    fn raw_response_maps_errors_and_parses_json() {
        let ok = RawResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: br#"{"token":"t"}"#.to_vec(),
        };
        assert_eq!(ok.into_json().unwrap(), json!({ "token": "t" }));

        let empty = RawResponse {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: Vec::new(),
        };
        assert_eq!(empty.into_json().unwrap(), Value::Null);

        let garbage = RawResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: b"<html>".to_vec(),
        };
        assert_eq!(garbage.into_json().unwrap_err(), AuthError::MalformedResponse);

        let denied = RawResponse {
            status: StatusCode::UNAUTHORIZED,
            headers: HeaderMap::new(),
            body: Vec::new(),
        };
        assert_eq!(denied.into_json().unwrap_err(), AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn post_json_sends_bearer_and_user_agent() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .and(header("authorization", "Bearer abc"))
            .and(header("user-agent", APP_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "xyz" })))
            .mount(&server)
            .await;

        let token = SecretString::from("abc".to_string());
        let body = client(&server.uri())
            .post_json("/auth/token", &json!({}), Some(&token))
            .await
            .unwrap();
        assert_eq!(body["token"], "xyz");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0") else {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        };
        let address = listener.local_addr().unwrap();
        drop(listener);

        let result = client(&format!("http://{address}"))
            .get_json("/api", None)
            .await;
        assert!(matches!(result, Err(AuthError::Network(_))));
    }
}
