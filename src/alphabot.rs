// alphabot.rs
use anyhow::Result;
use reqwest::{header, Client};
use serde_json::json;
use std::future::Future;

use crate::config::Config;
use crate::error::TransportError;

/// Raw outcome of one call to the registration endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Issues registration requests against the upstream API.
///
/// Implement this to replace the HTTP layer in tests.
pub trait RegistrationTransport: Send + Sync + Clone + 'static {
    fn post_register(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct AlphabotClient {
    client: Client,
    base_url: String,
}

impl AlphabotClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("raffle-webhook/0.1"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn register_url(&self) -> String {
        format!("{}/register", self.base_url)
    }
}

impl RegistrationTransport for AlphabotClient {
    async fn post_register(&self, slug: &str) -> Result<TransportResponse, TransportError> {
        let payload = json!({ "slug": slug });
        let response = self
            .client
            .post(self.register_url())
            .json(&payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?.to_vec();

        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}
