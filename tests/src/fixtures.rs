//! Webhook payload builders and a router wired to intake fakes.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rx_gateway::{build_router, sign, AppState, Dispatcher, EventIdCache};
use rx_intake::test_utils::TestHarness;
use rx_intake::IntakeConfig;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tower::ServiceExt;

pub const CHANNEL_SECRET: &str = "integration-secret";

static NEXT_EVENT: AtomicU64 = AtomicU64::new(1);

fn next_event_id() -> String {
    format!("01HZX{:020}", NEXT_EVENT.fetch_add(1, Ordering::Relaxed))
}

fn base_event(user: &str, reply_token: &str) -> Value {
    json!({
        "type": "message",
        "mode": "active",
        "timestamp": 1_718_326_800_000u64,
        "replyToken": reply_token,
        "webhookEventId": next_event_id(),
        "deliveryContext": { "isRedelivery": false },
        "source": { "type": "user", "userId": user },
    })
}

pub fn text_event(user: &str, reply_token: &str, text: &str) -> Value {
    let mut event = base_event(user, reply_token);
    event["message"] = json!({ "type": "text", "id": next_event_id(), "text": text });
    event
}

pub fn image_event(user: &str, reply_token: &str, message_id: &str) -> Value {
    let mut event = base_event(user, reply_token);
    event["message"] = json!({
        "type": "image",
        "id": message_id,
        "contentProvider": { "type": "line" },
    });
    event
}

pub fn follow_event(user: &str, reply_token: &str) -> Value {
    let mut event = base_event(user, reply_token);
    event["type"] = json!("follow");
    event
}

pub fn sticker_event(user: &str, reply_token: &str) -> Value {
    let mut event = base_event(user, reply_token);
    event["message"] = json!({ "type": "sticker", "id": "s1", "packageId": "1", "stickerId": "1" });
    event
}

/// Same event marked as a platform redelivery.
pub fn redelivered(mut event: Value) -> Value {
    event["deliveryContext"]["isRedelivery"] = json!(true);
    event
}

pub fn payload(events: &[Value]) -> String {
    json!({ "destination": "Ubot0000", "events": events }).to_string()
}

pub fn signed_request(path: &str, body: &str) -> Request<Body> {
    request(path, body, Some(sign(body.as_bytes(), CHANNEL_SECRET.as_bytes())))
}

pub fn request(path: &str, body: &str, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-line-signature", signature);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// Router over an intake harness, with handles to the fakes.
pub struct WebhookApp {
    pub harness: TestHarness,
    pub router: Router,
}

impl WebhookApp {
    pub fn new() -> Self {
        Self::with_config(IntakeConfig::default())
    }

    pub fn with_config(config: IntakeConfig) -> Self {
        let harness = TestHarness::with_config(config);
        let dispatcher = Dispatcher::new(harness.service.clone(), harness.messaging.clone())
            .with_event_cache(EventIdCache::new());
        let router = build_router(AppState::new(dispatcher, CHANNEL_SECRET));
        Self { harness, router }
    }

    pub async fn send(&self, request: Request<Body>) -> StatusCode {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
            .status()
    }

    /// Sign and post `events` to `/callback`.
    pub async fn deliver(&self, events: &[Value]) -> StatusCode {
        self.send(signed_request("/callback", &payload(events))).await
    }

    /// Text of every message replied with `reply_token`.
    pub fn reply_texts(&self, reply_token: &str) -> Vec<String> {
        self.harness
            .messaging
            .replies()
            .into_iter()
            .filter(|r| r.reply_token == reply_token)
            .flat_map(|r| r.messages)
            .filter_map(|m| m.as_text().map(str::to_string))
            .collect()
    }
}

impl Default for WebhookApp {
    fn default() -> Self {
        Self::new()
    }
}
