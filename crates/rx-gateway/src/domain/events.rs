//! Webhook payload parsing.
//!
//! Only the fields the intake needs are read. Events outside
//! `{follow, message/image, message/text}` or without a user id are skipped.

use super::error::GatewayError;
use rx_intake::InboundEvent;
use serde::Deserialize;
use tracing::debug;

/// One parsed event with its delivery metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// One-shot token for answering this event.
    pub reply_token: Option<String>,
    /// Platform-wide event id, stable across redeliveries.
    pub webhook_event_id: Option<String>,
    pub redelivery: bool,
    pub event: InboundEvent,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    reply_token: Option<String>,
    source: Option<RawSource>,
    message: Option<RawMessage>,
    webhook_event_id: Option<String>,
    delivery_context: Option<RawDeliveryContext>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSource {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    id: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDeliveryContext {
    #[serde(default)]
    is_redelivery: bool,
}

/// Parse a verified webhook body into events, in payload order.
///
/// ## Errors
///
/// - `BadPayload`: the body is not a JSON object with an `events` array
pub fn parse_events(body: &[u8]) -> Result<Vec<WebhookEvent>, GatewayError> {
    let payload: RawPayload =
        serde_json::from_slice(body).map_err(|e| GatewayError::BadPayload(e.to_string()))?;

    Ok(payload.events.into_iter().filter_map(convert).collect())
}

fn convert(raw: RawEvent) -> Option<WebhookEvent> {
    let Some(user_id) = raw.source.and_then(|s| s.user_id) else {
        debug!(kind = %raw.kind, "[rx-gateway] event without user id skipped");
        return None;
    };

    let event = match (raw.kind.as_str(), raw.message) {
        ("follow", _) => InboundEvent::follow(user_id),
        ("message", Some(RawMessage { kind, id, text })) => match (kind.as_str(), id, text) {
            ("image", Some(id), _) => InboundEvent::image(user_id, id),
            ("text", _, Some(text)) => InboundEvent::text(user_id, text),
            (other, _, _) => {
                debug!(message_type = %other, "[rx-gateway] message type skipped");
                return None;
            }
        },
        (other, _) => {
            debug!(kind = %other, "[rx-gateway] event type skipped");
            return None;
        }
    };

    Some(WebhookEvent {
        reply_token: raw.reply_token,
        webhook_event_id: raw.webhook_event_id,
        redelivery: raw
            .delivery_context
            .map(|c| c.is_redelivery)
            .unwrap_or(false),
        event,
    })
}
