// webhook.rs
use axum::http::StatusCode;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::alphabot::RegistrationTransport;
use crate::dispatcher::RetryingDispatcher;
use crate::error::WebhookError;
use crate::signature::SignatureVerifier;
use crate::WebhookEvent;

#[derive(Debug, Clone)]
pub struct WebhookHandler<T> {
    verifier: SignatureVerifier,
    dispatcher: RetryingDispatcher<T>,
}

impl<T: RegistrationTransport> WebhookHandler<T> {
    pub fn new(verifier: SignatureVerifier, dispatcher: RetryingDispatcher<T>) -> Self {
        Self {
            verifier,
            dispatcher,
        }
    }

    /// Processes one delivery and returns the acknowledgement to send back.
    pub async fn handle(&self, raw_body: &[u8]) -> (StatusCode, Value) {
        match self.process(raw_body).await {
            Ok(()) => (StatusCode::OK, json!({ "status": "success" })),
            Err(err) => (err.status(), err.body()),
        }
    }

    pub async fn process(&self, raw_body: &[u8]) -> Result<(), WebhookError> {
        let event = decode(raw_body)?;

        let timestamp = event.timestamp_text();
        if !self.verifier.verify(
            event.event.as_deref(),
            timestamp.as_deref(),
            event.signature.as_deref(),
        ) {
            warn!(event = ?event.event, "Invalid hash received");
            return Err(WebhookError::InvalidHash);
        }

        if event.triggers_registration() {
            if let Some(slug) = event.raffle_slug() {
                self.register(slug).await;
            }
        }

        info!(event = ?event.event, "Webhook received");
        Ok(())
    }

    /// The outcome is only logged; it never changes the acknowledgement.
    async fn register(&self, slug: &str) {
        match self.dispatcher.dispatch(slug).await {
            Some(_) => info!(slug, "Raffle registration succeeded"),
            None => error!(slug, "Raffle registration failed"),
        }
    }
}

fn decode(raw_body: &[u8]) -> Result<WebhookEvent, WebhookError> {
    let text = std::str::from_utf8(raw_body).map_err(|_| {
        warn!("Webhook payload is not valid UTF-8");
        WebhookError::InvalidPayload
    })?;
    info!(payload = text, "Raw webhook payload received");

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) if !object.is_empty() => Ok(WebhookEvent::from_object(&object)),
        _ => {
            warn!("Empty or invalid webhook payload");
            Err(WebhookError::InvalidPayload)
        }
    }
}
