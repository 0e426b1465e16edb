//! Gateway domain: payload model, rejection errors and the redelivery cache.

pub mod dedupe;
pub mod error;
pub mod events;

pub use dedupe::EventIdCache;
pub use error::GatewayError;
pub use events::{parse_events, WebhookEvent};
