// dispatcher.rs
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::alphabot::{RegistrationTransport, TransportResponse};
use crate::config::Config;
use crate::error::DispatchError;
use crate::{AttemptOutcome, RegistrationAttempt};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(10);

/// Reads a `Retry-After` value in whole seconds, falling back to `default`.
pub fn parse_retry_after(value: Option<&str>, default: Duration) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Registers raffles upstream, backing off on 429 as the server instructs.
#[derive(Debug, Clone)]
pub struct RetryingDispatcher<T> {
    transport: T,
    max_retries: u32,
    default_retry_after: Duration,
}

impl<T: RegistrationTransport> RetryingDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_retries: DEFAULT_MAX_RETRIES,
            default_retry_after: DEFAULT_RETRY_AFTER,
        }
    }

    pub fn from_config(transport: T, config: &Config) -> Self {
        Self {
            transport,
            max_retries: config.max_retries,
            default_retry_after: config.default_retry_after(),
        }
    }

    pub async fn dispatch(&self, target: &str) -> Option<Value> {
        self.dispatch_with_retries(target, self.max_retries).await
    }

    /// Runs up to `max_retries` sequential attempts. `None` means every attempt
    /// failed or a failure was not worth retrying.
    pub async fn dispatch_with_retries(&self, target: &str, max_retries: u32) -> Option<Value> {
        let max_attempts = max_retries.max(1);

        for attempt_number in 1..=max_attempts {
            info!(
                slug = target,
                attempt = attempt_number,
                "Attempting raffle registration"
            );

            let outcome = self.attempt(target).await;
            let attempt = RegistrationAttempt::new(target, attempt_number, outcome);

            match attempt.retire(max_attempts) {
                AttemptOutcome::Success(body) => return Some(body),
                AttemptOutcome::RateLimited(wait) => {
                    warn!(
                        slug = target,
                        retry_after_secs = wait.as_secs(),
                        "Rate limit exceeded, waiting before retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                AttemptOutcome::Failure(err) if err.is_retryable() => {
                    error!(slug = target, attempt = attempt_number, "Raffle registration failed: {}", err);
                }
                AttemptOutcome::Failure(err) => {
                    error!(slug = target, "Raffle registration failed permanently: {}", err);
                    return None;
                }
                AttemptOutcome::Exhausted(last) => {
                    error!(
                        slug = target,
                        attempts = max_attempts,
                        "Maximum attempts reached, raffle registration failed: {}",
                        last
                    );
                    return None;
                }
            }
        }

        None
    }

    async fn attempt(&self, target: &str) -> AttemptOutcome {
        match self.transport.post_register(target).await {
            Ok(response) => self.classify(response),
            Err(err) => AttemptOutcome::Failure(err.into()),
        }
    }

    fn classify(&self, response: TransportResponse) -> AttemptOutcome {
        if response.is_rate_limited() {
            let wait = parse_retry_after(response.retry_after.as_deref(), self.default_retry_after);
            return AttemptOutcome::RateLimited(wait);
        }

        if !response.is_success() {
            return AttemptOutcome::Failure(DispatchError::Status(response.status));
        }

        match serde_json::from_slice(&response.body) {
            Ok(body) => AttemptOutcome::Success(body),
            Err(e) => AttemptOutcome::Failure(DispatchError::Decode(e.to_string())),
        }
    }
}
