use crate::auth::ClientConfig;
use anyhow::{Context, Result};
use std::time::Duration;

/// Connection settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub url: Option<String>,
    pub timeout: Duration,
    pub app_version: String,
    pub device_uid: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(url: Option<String>, timeout: Duration, app_version: String, device_uid: String) -> Self {
        Self {
            url,
            timeout,
            app_version,
            device_uid,
        }
    }

    /// Client settings for `--url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `--url` is missing or not an http(s) URL.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let url = self
            .url
            .as_deref()
            .context("missing required argument: --url (or MAGE_AUTH_URL)")?;

        let config = ClientConfig::new(url, self.device_uid.clone())
            .with_context(|| format!("invalid server URL: {url}"))?;

        Ok(config
            .with_timeout(self.timeout)
            .with_app_version(self.app_version.clone()))
    }
}
