//! # Webhook Gateway (rx-gateway)
//!
//! HTTP front of the intake bot.
//!
//! ## Request Flow
//!
//! ```text
//! POST /callback ──→ verify X-Line-Signature ──→ parse events ──→ Dispatcher
//!                        │ (400 on failure)          │              │
//!                        ↓                           ↓              ↓
//!                   no side effects        skip unknown kinds   IntakeApi + reply
//! ```
//!
//! A rejected delivery never reaches the intake service. Once verified, each
//! event is handled in payload order and answered through its reply token.

pub mod dispatcher;
pub mod domain;
pub mod housekeeping;
pub mod router;
pub mod signature;

pub use dispatcher::{DispatchSummary, Dispatcher};
pub use domain::{parse_events, EventIdCache, GatewayError, WebhookEvent};
pub use housekeeping::{cleanup_task, CLEANUP_INTERVAL};
pub use router::{build_router, AppState, MAX_BODY_BYTES};
pub use signature::{sign, verify_signature, SIGNATURE_HEADER};
