//! Interchangeable ways of performing one HTTP exchange.

use super::fixtures::{fixture_key, FixtureSet};
use crate::{auth::error::TransportError, APP_USER_AGENT};
use async_trait::async_trait;
use reqwest::Method;
use std::{collections::BTreeMap, time::Duration};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path relative to the server root, optionally with a query string.
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// `"<METHOD> <PATH>"`.
    #[must_use]
    pub fn key(&self) -> String {
        fixture_key(&self.method, &self.path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Lower-cased header names.
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Error)]
pub enum PerformError {
    #[error("no fixture for {0}")]
    MissingFixture(String),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("transport failure: {0}")]
    Transport(TransportError),
}

#[async_trait]
pub trait HttpPerformer: Send + Sync {
    /// Label used in reports.
    fn name(&self) -> &str;

    async fn perform(&self, request: &HttpRequest) -> Result<HttpResponse, PerformError>;
}

/// Performs requests against a live server.
#[derive(Clone, Debug)]
pub struct ReqwestPerformer {
    name: String,
    base_url: Url,
    http: reqwest::Client,
}

impl ReqwestPerformer {
    /// # Errors
    ///
    /// Returns [`PerformError::InvalidRequest`] if the HTTP client cannot be built.
    pub fn new(name: impl Into<String>, base_url: Url, timeout: Duration) -> Result<Self, PerformError> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|err| PerformError::InvalidRequest(err.to_string()))?;

        Ok(Self {
            name: name.into(),
            base_url,
            http,
        })
    }

    fn url(&self, path: &str) -> Result<Url, PerformError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim().trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

#[async_trait]
impl HttpPerformer for ReqwestPerformer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request), fields(performer = %self.name, key = %request.key()))]
    async fn perform(&self, request: &HttpRequest) -> Result<HttpResponse, PerformError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path)?);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            if !request.headers.keys().any(|name| name.eq_ignore_ascii_case("content-type")) {
                builder = builder.header("content-type", "application/json");
            }
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| PerformError::Transport(TransportError::from(&err)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_lowercase(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|err| PerformError::Transport(TransportError::from(&err)))?;

        debug!("-> {status}");

        Ok(HttpResponse {
            status,
            headers,
            body: (!body.is_empty()).then(|| body.to_vec()),
        })
    }
}

/// Serves canned responses from a [`FixtureSet`].
#[derive(Clone, Debug)]
pub struct FixturePerformer {
    name: String,
    fixtures: FixtureSet,
}

impl FixturePerformer {
    #[must_use]
    pub fn new(name: impl Into<String>, fixtures: FixtureSet) -> Self {
        Self {
            name: name.into(),
            fixtures,
        }
    }
}

#[async_trait]
impl HttpPerformer for FixturePerformer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn perform(&self, request: &HttpRequest) -> Result<HttpResponse, PerformError> {
        self.fixtures
            .get(&request.method, &request.path)
            .map(|fixture| fixture.response.clone())
            .ok_or_else(|| PerformError::MissingFixture(request.key()))
    }
}
