// server.rs
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use std::{any::Any, sync::Arc};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use crate::alphabot::RegistrationTransport;
use crate::error::WebhookError;
use crate::webhook::WebhookHandler;

#[derive(Debug)]
pub struct AppState<T> {
    pub webhook_handler: WebhookHandler<T>,
}

impl<T> AppState<T> {
    pub fn new(webhook_handler: WebhookHandler<T>) -> Self {
        Self { webhook_handler }
    }
}

pub fn router<T: RegistrationTransport>(state: AppState<T>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook::<T>))
        .route("/health", get(health_check))
        .with_state(Arc::new(state))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

async fn handle_webhook<T: RegistrationTransport>(
    State(state): State<Arc<AppState<T>>>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let (status, body) = state.webhook_handler.handle(&body).await;
    (status, Json(body))
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now()
    }))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "internal error".to_string()
    };

    error!("Error processing webhook: {}", message);
    WebhookError::Internal(message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabot::TransportResponse;
    use crate::dispatcher::RetryingDispatcher;
    use crate::error::TransportError;
    use crate::signature::{sign, SignatureVerifier};
    use axum::{body::Body, http::Request};
    use serde_json::json;
    use tower::ServiceExt;

    const SECRET: &[u8] = b"test-secret";

    #[derive(Clone)]
    struct PanickingTransport;

    impl RegistrationTransport for PanickingTransport {
        async fn post_register(&self, slug: &str) -> Result<TransportResponse, TransportError> {
            panic!("transport exploded for {}", slug)
        }
    }

    async fn explode() -> StatusCode {
        panic!("exploded")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let app: Router = Router::new()
            .route("/boom", get(explode))
            .layer(CatchPanicLayer::custom(handle_panic));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"status": "error", "message": "exploded"})
        );
    }

    #[tokio::test]
    async fn panic_during_dispatch_is_served_as_500() {
        let handler = WebhookHandler::new(
            SignatureVerifier::new(SECRET),
            RetryingDispatcher::new(PanickingTransport),
        );
        let app = router(AppState::new(handler));

        let payload = json!({
            "event": "raffle:created",
            "timestamp": "1718000000",
            "hash": sign(SECRET, "raffle:created", "1718000000").unwrap(),
            "data": {"raffle": {"slug": "spring-drop"}},
        })
        .to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(payload))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"status": "error", "message": "transport exploded for spring-drop"})
        );
    }
}
