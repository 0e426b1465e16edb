//! # Event Dispatcher
//!
//! Runs the events of one verified delivery through the intake service, in
//! payload order, and answers each one through its reply token.
//!
//! Reply failures are logged and counted; they never fail the delivery.

use crate::domain::{EventIdCache, WebhookEvent};
use rx_intake::{EventOutcome, IntakeApi, MessagingClient, ReplyKind};
use rx_telemetry::metric_inc;
use rx_telemetry::metrics::{
    ACTIVE_SESSIONS, ARTIFACT_FAILURES, EVENTS_DEDUPLICATED, EVENTS_HANDLED, IMAGES_CAPTURED,
    INTAKES_FINALIZED, REPLIES_SENT, REPLY_FAILURES,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Counts for one delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub handled: usize,
    pub duplicates: usize,
    pub replies_sent: usize,
    pub reply_failures: usize,
}

/// Routes parsed events to the intake service and sends the replies.
pub struct Dispatcher {
    intake: Arc<dyn IntakeApi>,
    messaging: Arc<dyn MessagingClient>,
    seen: EventIdCache,
}

impl Dispatcher {
    pub fn new(intake: Arc<dyn IntakeApi>, messaging: Arc<dyn MessagingClient>) -> Self {
        Self {
            intake,
            messaging,
            seen: EventIdCache::new(),
        }
    }

    /// Replace the redelivery cache.
    pub fn with_event_cache(mut self, cache: EventIdCache) -> Self {
        self.seen = cache;
        self
    }

    pub fn intake(&self) -> &Arc<dyn IntakeApi> {
        &self.intake
    }

    /// Handle every event of one delivery, one after another.
    pub async fn dispatch(&self, events: Vec<WebhookEvent>) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for event in events {
            if let Some(id) = &event.webhook_event_id {
                if !self.seen.check_and_insert(id) {
                    debug!(
                        webhook_event_id = %id,
                        redelivery = event.redelivery,
                        "[rx-gateway] duplicate event skipped"
                    );
                    metric_inc!(EVENTS_DEDUPLICATED);
                    summary.duplicates += 1;
                    continue;
                }
            }

            let kind = event.event.kind.name();
            let user_id = event.event.user_id.clone();
            metric_inc!(EVENTS_HANDLED, &[kind]);

            let outcome = self.intake.handle_event(event.event).await;
            summary.handled += 1;
            record_outcome(&outcome);

            let Some(token) = event.reply_token.as_deref() else {
                debug!(user_id = %user_id, "[rx-gateway] event has no reply token");
                continue;
            };
            if outcome.replies.is_empty() {
                continue;
            }

            let label = outcome.reply.as_ref().map(ReplyKind::label).unwrap_or("summary");
            match self.messaging.reply(token, &outcome.replies).await {
                Ok(()) => {
                    metric_inc!(REPLIES_SENT, &[label]);
                    summary.replies_sent += 1;
                }
                Err(err) => {
                    warn!(
                        user_id = %user_id,
                        reply = label,
                        step = err.step(),
                        "[rx-gateway] reply failed: {}",
                        err
                    );
                    metric_inc!(REPLY_FAILURES);
                    summary.reply_failures += 1;
                }
            }
        }

        ACTIVE_SESSIONS.set(self.intake.active_sessions() as f64);
        summary
    }
}

fn record_outcome(outcome: &EventOutcome) {
    if matches!(
        outcome.reply,
        Some(ReplyKind::ImageReceived { .. } | ReplyKind::ImageReceivedPhoneNext { .. })
    ) {
        metric_inc!(IMAGES_CAPTURED);
    }

    if let Some(receipt_id) = &outcome.finalized {
        metric_inc!(INTAKES_FINALIZED);
        info!(receipt_id = %receipt_id, "[rx-gateway] intake completed");
    }

    if let Some(report) = &outcome.report {
        for artifact in &report.artifacts {
            for step in artifact.failed_steps() {
                metric_inc!(ARTIFACT_FAILURES, &[step]);
            }
        }
    }
}
