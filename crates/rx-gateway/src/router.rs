//! # HTTP Surface
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/callback`, `/webhook` | POST | Signed webhook deliveries |
//! | `/`, `/health` | GET | Liveness (`OK`) |
//! | `/metrics` | GET | Prometheus text format |

use crate::dispatcher::Dispatcher;
use crate::domain::{parse_events, GatewayError};
use crate::signature::{verify_signature, SIGNATURE_HEADER};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use rx_telemetry::metric_inc;
use rx_telemetry::metrics::{encode_metrics, WEBHOOK_DURATION, WEBHOOK_REQUESTS};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};

/// Largest accepted webhook body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub channel_secret: Arc<[u8]>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, channel_secret: impl AsRef<[u8]>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            channel_secret: Arc::from(channel_secret.as_ref()),
        }
    }
}

/// Build the router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    Router::new()
        .route("/callback", post(handle_webhook))
        .route("/webhook", post(handle_webhook))
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(middleware)
        .with_state(state)
}

/// Verify, parse and dispatch one delivery.
async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, GatewayError> {
    let _timer = WEBHOOK_DURATION.start_timer();
    let span = info_span!("webhook", bytes = body.len());

    let result = async {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(GatewayError::MissingSignature)?;
        if !verify_signature(&body, signature, &state.channel_secret) {
            return Err(GatewayError::InvalidSignature);
        }

        let events = parse_events(&body)?;
        let count = events.len();
        let summary = state.dispatcher.dispatch(events).await;
        info!(
            events = count,
            handled = summary.handled,
            duplicates = summary.duplicates,
            reply_failures = summary.reply_failures,
            "[rx-gateway] delivery processed"
        );
        Ok("OK")
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => metric_inc!(WEBHOOK_REQUESTS, &["ok"]),
        Err(err) => {
            warn!("[rx-gateway] 🚫 delivery rejected: {}", err);
            metric_inc!(WEBHOOK_REQUESTS, &[err.label()]);
        }
    }
    result
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics_handler() -> impl IntoResponse {
    match encode_metrics() {
        Ok(text) => (StatusCode::OK, text),
        Err(err) => {
            error!("[rx-gateway] metrics encoding failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rx_intake::test_utils::TestHarness;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    fn router(harness: &TestHarness) -> Router {
        let dispatcher = Dispatcher::new(harness.service.clone(), harness.messaging.clone());
        build_router(AppState::new(dispatcher, SECRET))
    }

    fn text_payload(user: &str, text: &str) -> String {
        serde_json::json!({
            "destination": "Ubot",
            "events": [{
                "type": "message",
                "replyToken": "rt",
                "source": {"type": "user", "userId": user},
                "message": {"type": "text", "id": "m1", "text": text}
            }]
        })
        .to_string()
    }

    fn signed(path: &str, body: &str, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(path);
        if let Some(signature) = signature {
            builder = builder.header("X-Line-Signature", signature);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health_routes() {
        let harness = TestHarness::new();
        for path in ["/", "/health"] {
            let response = router(&harness)
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = to_bytes(response.into_body(), 64).await.unwrap();
            assert_eq!(&body[..], b"OK");
        }
    }

    #[tokio::test]
    async fn test_signed_delivery_is_dispatched_on_both_paths() {
        let harness = TestHarness::new();
        for (path, user) in [("/callback", "U1"), ("/webhook", "U2")] {
            let body = text_payload(user, "同意");
            let response = router(&harness)
                .oneshot(signed(path, &body, Some(sign(body.as_bytes(), SECRET.as_bytes()))))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert!(harness.has_session(user));
        }
        assert_eq!(harness.messaging.replies().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_signature_is_rejected_without_side_effects() {
        let harness = TestHarness::new();
        let body = text_payload("U1", "同意");
        let response = router(&harness)
            .oneshot(signed("/callback", &body, Some("bm90LWEtc2lnbmF0dXJl".into())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!harness.has_session("U1"));
        assert!(harness.messaging.replies().is_empty());
    }

    #[tokio::test]
    async fn test_missing_signature_is_rejected() {
        let harness = TestHarness::new();
        let body = text_payload("U1", "同意");
        let response = router(&harness)
            .oneshot(signed("/callback", &body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_signed_garbage_is_bad_request() {
        let harness = TestHarness::new();
        let body = "{not json";
        let response = router(&harness)
            .oneshot(signed("/callback", body, Some(sign(body.as_bytes(), SECRET.as_bytes()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        rx_telemetry::register_metrics().unwrap();
        let harness = TestHarness::new();
        let response = router(&harness)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("rx_"));
    }
}
