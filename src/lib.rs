pub mod alphabot;
pub mod config;
pub mod dispatcher;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod mocks;
pub mod server;
pub mod signature;
pub mod webhook;

use serde_json::{Map, Value};
use std::time::Duration;

use error::DispatchError;

/// Event kinds that trigger a raffle registration.
pub const REGISTRATION_EVENTS: [&str; 3] = ["raffle:created", "raffle:edited", "raffle:active"];

/// A decoded inbound notification. Fields the sender left out stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub event: Option<String>,
    pub timestamp: Option<Value>,
    pub signature: Option<String>,
    pub data: Value,
}

impl WebhookEvent {
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            event: object
                .get("event")
                .and_then(Value::as_str)
                .map(str::to_owned),
            timestamp: object.get("timestamp").filter(|v| !v.is_null()).cloned(),
            signature: object
                .get("hash")
                .and_then(Value::as_str)
                .map(str::to_owned),
            data: object
                .get("data")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        }
    }

    /// The timestamp as the sender rendered it into the signed message.
    ///
    /// Strings are used verbatim and numbers in their decimal form; any other
    /// JSON type has no agreed rendering and yields `None`.
    pub fn timestamp_text(&self) -> Option<String> {
        match self.timestamp.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn triggers_registration(&self) -> bool {
        self.event
            .as_deref()
            .is_some_and(|event| REGISTRATION_EVENTS.contains(&event))
    }

    /// `data.raffle.slug`, when present and non-empty.
    pub fn raffle_slug(&self) -> Option<&str> {
        self.data["raffle"]["slug"]
            .as_str()
            .filter(|slug| !slug.is_empty())
    }
}

/// Result of a single registration attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(Value),
    RateLimited(Duration),
    Failure(DispatchError),
    /// No attempts remain; carries the reason the last one failed.
    Exhausted(DispatchError),
}

/// One call against the registration endpoint within a dispatch sequence.
#[derive(Debug)]
pub struct RegistrationAttempt<'a> {
    pub target: &'a str,
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
}

impl<'a> RegistrationAttempt<'a> {
    pub fn new(target: &'a str, attempt_number: u32, outcome: AttemptOutcome) -> Self {
        Self {
            target,
            attempt_number,
            outcome,
        }
    }

    /// Collapses a retryable outcome on the last permitted attempt into `Exhausted`.
    pub fn retire(self, max_attempts: u32) -> AttemptOutcome {
        let last = self.attempt_number >= max_attempts;
        match self.outcome {
            AttemptOutcome::RateLimited(wait) if last => {
                AttemptOutcome::Exhausted(DispatchError::RateLimited(wait.as_secs()))
            }
            AttemptOutcome::Failure(err) if last && err.is_retryable() => AttemptOutcome::Exhausted(err),
            outcome => outcome,
        }
    }
}
