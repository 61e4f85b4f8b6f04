// config.rs
use anyhow::{Context, Result};
use ::config::{Environment, Source};
use serde::Deserialize;
use std::{fmt, time::Duration};

pub const DEFAULT_BASE_URL: &str = "https://api.alphabot.app/v1";

#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "alphabot_api_key")]
    pub api_key: String,
    #[serde(default)]
    webhook_secret: Option<String>,
    #[serde(rename = "alphabot_api_base_url")]
    pub base_url: String,
    pub bind_address: String,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    pub default_retry_after_secs: u64,
    pub log_signature_inputs: bool,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_source(Environment::default())
    }

    pub fn from_source<S>(source: S) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let config: Config = ::config::Config::builder()
            .set_default("alphabot_api_base_url", DEFAULT_BASE_URL)?
            .set_default("bind_address", "0.0.0.0:5000")?
            .set_default("max_retries", 3)?
            .set_default("request_timeout_secs", 30)?
            .set_default("default_retry_after_secs", 10)?
            .set_default("log_signature_inputs", false)?
            .add_source(source)
            .build()?
            .try_deserialize()
            .context("ALPHABOT_API_KEY not set or configuration invalid")?;

        if config.api_key.trim().is_empty() {
            anyhow::bail!("ALPHABOT_API_KEY must not be empty");
        }

        Ok(Config {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        })
    }

    /// HMAC key for inbound webhooks. The platform signs with the account API key
    /// unless a dedicated secret is configured.
    pub fn webhook_secret(&self) -> &str {
        self.webhook_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .unwrap_or(&self.api_key)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn default_retry_after(&self) -> Duration {
        Duration::from_secs(self.default_retry_after_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("bind_address", &self.bind_address)
            .field("max_retries", &self.max_retries)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("default_retry_after_secs", &self.default_retry_after_secs)
            .field("log_signature_inputs", &self.log_signature_inputs)
            .finish()
    }
}
