//! In-memory registration transport for tests.
//!
//! Enabled with the `test-support` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use crate::alphabot::{RegistrationTransport, TransportResponse};
use crate::error::TransportError;

/// Replays scripted responses in order and records every call.
///
/// Once the script runs out, every further call gets the fallback response.
#[derive(Clone)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Result<TransportResponse, TransportError>>>>,
    fallback: Result<TransportResponse, TransportError>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub slug: String,
    pub at: Instant,
}

impl MockTransport {
    pub fn new(fallback: Result<TransportResponse, TransportError>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every call succeeds with `200` and the given JSON body.
    pub fn always_ok(body: serde_json::Value) -> Self {
        Self::new(Ok(ok(body)))
    }

    pub fn then(self, response: Result<TransportResponse, TransportError>) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn slugs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.slug).collect()
    }
}

impl RegistrationTransport for MockTransport {
    async fn post_register(&self, slug: &str) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            slug: slug.to_string(),
            at: Instant::now(),
        });
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn ok(body: serde_json::Value) -> TransportResponse {
    TransportResponse {
        status: 200,
        retry_after: None,
        body: serde_json::to_vec(&body).unwrap(),
    }
}

pub fn status(code: u16) -> TransportResponse {
    TransportResponse {
        status: code,
        retry_after: None,
        body: Vec::new(),
    }
}

pub fn rate_limited(retry_after: Option<&str>) -> TransportResponse {
    TransportResponse {
        status: 429,
        retry_after: retry_after.map(str::to_owned),
        body: Vec::new(),
    }
}
