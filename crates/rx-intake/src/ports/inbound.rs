//! # Inbound Ports (Driving Ports)
//!
//! The API the webhook dispatcher drives.

use crate::domain::artifact::FinalizationReport;
use crate::domain::conversation::ReplyKind;
use crate::domain::entities::{InboundEvent, OutboundMessage, ReceiptId, Stage};
use async_trait::async_trait;

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    /// Messages to send back through the event's reply token.
    pub replies: Vec<OutboundMessage>,
    /// Which reply was chosen; `None` for the finalization summary.
    pub reply: Option<ReplyKind>,
    /// Stage after the event; `None` when the user has no session.
    pub stage: Option<Stage>,
    /// Receipt finalized by this event, if any.
    pub finalized: Option<ReceiptId>,
    /// Per-image pipeline outcome when this event finalized an intake.
    pub report: Option<FinalizationReport>,
}

impl EventOutcome {
    /// Concatenated reply texts, for logs and tests.
    pub fn reply_text(&self) -> String {
        self.replies
            .iter()
            .filter_map(OutboundMessage::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Primary API of the intake subsystem.
#[async_trait]
pub trait IntakeApi: Send + Sync {
    /// Run one event through the user's conversation.
    ///
    /// Never fails: collaborator errors are logged and turned into an
    /// apology reply for this user only. Events for the same user are
    /// serialized; events for different users run concurrently.
    async fn handle_event(&self, event: InboundEvent) -> EventOutcome;

    /// Drop sessions idle for longer than the configured timeout.
    fn purge_idle_sessions(&self) -> usize;

    /// Number of live sessions.
    fn active_sessions(&self) -> usize;
}
