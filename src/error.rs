// error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Failure of a single outbound HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request could not be built: {0}")]
    Builder(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// A request that cannot even be built will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Builder(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_builder() {
            TransportError::Builder(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Why a registration attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("response body is not valid JSON: {0}")]
    Decode(String),
    #[error("upstream rate limited, retry after {0}s")]
    RateLimited(u64),
}

impl DispatchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            DispatchError::Transport(err) => err.is_retryable(),
            DispatchError::Status(_) | DispatchError::Decode(_) | DispatchError::RateLimited(_) => true,
        }
    }
}

/// Reasons an inbound webhook is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("invalid payload")]
    InvalidPayload,
    #[error("invalid hash")]
    InvalidHash,
    #[error("{0}")]
    Internal(String),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::InvalidPayload | WebhookError::InvalidHash => StatusCode::BAD_REQUEST,
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> Value {
        json!({
            "status": "error",
            "message": self.to_string(),
        })
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
