//! # Intake Service
//!
//! The application service implementing [`IntakeApi`].
//!
//! ## Architecture
//!
//! For each inbound event the service:
//! 1. Takes the user's async lock (events of one user never interleave)
//! 2. Asks the conversation machine what the event means in the current state
//! 3. Performs the side effects (content fetch, receipt allocation, image write,
//!    finalization pipeline)
//! 4. Writes the new state back (or deletes the session after finalization)
//! 5. Renders the reply
//!
//! Failures never escape `handle_event`. Collaborator errors while capturing an
//! image leave the session as it was; anything else produces an apology.

mod pipeline;
mod receipt;

pub use pipeline::{ArtifactPipeline, PrintTarget, UploadTarget};
pub use receipt::ReceiptIdGenerator;

use crate::domain::conversation::{ConversationPolicy, ImagePlan, ReplyKind, TextTransition};
use crate::domain::entities::{
    artifact_stem, EventKind, InboundEvent, ReceiptId, Session, SessionState, Stage, StoredImage,
    UserId,
};
use crate::domain::errors::IntakeError;
use crate::domain::messages::MessageCatalog;
use crate::ports::inbound::{EventOutcome, IntakeApi};
use crate::ports::outbound::{Clock, DocumentRenderer, ImageStore, MessagingClient, SessionStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Conversation and housekeeping settings.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub policy: ConversationPolicy,
    pub catalog: MessageCatalog,
    /// Sessions untouched for longer than this are purged.
    pub session_idle_timeout: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            policy: ConversationPolicy::default(),
            catalog: MessageCatalog::default(),
            session_idle_timeout: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Dependencies for [`IntakeService`].
pub struct IntakeDependencies {
    pub sessions: Arc<dyn SessionStore>,
    pub clock: Arc<dyn Clock>,
    pub messaging: Arc<dyn MessagingClient>,
    pub images: Arc<dyn ImageStore>,
    pub renderer: Arc<dyn DocumentRenderer>,
    /// Enables the remote upload step.
    pub upload: Option<UploadTarget>,
    /// Enables the print step.
    pub print: Option<PrintTarget>,
}

/// The intake service.
pub struct IntakeService {
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    messaging: Arc<dyn MessagingClient>,
    images: Arc<dyn ImageStore>,
    pipeline: ArtifactPipeline,
    receipts: ReceiptIdGenerator,
    config: IntakeConfig,
    /// Per-user event locks.
    user_locks: DashMap<UserId, Arc<tokio::sync::Mutex<()>>>,
}

impl IntakeService {
    /// Create the service. Receipt numbering resumes after today's artifacts
    /// already present in the image store.
    pub fn new(deps: IntakeDependencies, config: IntakeConfig) -> Self {
        let receipts = ReceiptIdGenerator::seeded(deps.clock.clone(), deps.images.as_ref());
        let pipeline = ArtifactPipeline::new(
            deps.images.clone(),
            deps.renderer,
            deps.upload,
            deps.print,
        );
        Self {
            sessions: deps.sessions,
            clock: deps.clock,
            messaging: deps.messaging,
            images: deps.images,
            pipeline,
            receipts,
            config,
            user_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Most recently allocated receipt id.
    pub fn last_receipt(&self) -> Option<ReceiptId> {
        self.receipts.last()
    }

    fn user_lock(&self, user_id: &UserId) -> Arc<tokio::sync::Mutex<()>> {
        self.user_locks.entry(user_id.clone()).or_default().clone()
    }

    /// Forget the lock once nobody else holds or waits on it.
    fn release_user_lock(&self, user_id: &UserId) {
        self.user_locks
            .remove_if(user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn current_stage(&self, user_id: &UserId) -> Option<Stage> {
        self.sessions.get(user_id).map(|s| s.stage())
    }

    fn outcome(&self, user_id: &UserId, reply: ReplyKind) -> EventOutcome {
        EventOutcome {
            replies: self.config.catalog.render(reply),
            reply: Some(reply),
            stage: self.current_stage(user_id),
            finalized: None,
            report: None,
        }
    }

    /// Store `state` as the user's session, creating it if needed.
    fn commit(&self, user_id: &UserId, state: SessionState) -> Result<Session, IntakeError> {
        let now = self.clock.now();
        self.sessions.create_if_absent(user_id, now);
        let session = self.sessions.update(
            user_id,
            Box::new(move |session| {
                session.state = state;
                session.updated_at = now;
            }),
        )?;
        Ok(session)
    }

    /// Refresh the idle timer of an existing session.
    fn touch(&self, user_id: &UserId) {
        let now = self.clock.now();
        // No session is fine: nothing to keep alive.
        let _ = self
            .sessions
            .update(user_id, Box::new(move |session| session.updated_at = now));
    }

    // =========================================================================
    // EVENT HANDLERS
    // =========================================================================

    fn on_follow(&self, user_id: &UserId) -> Result<EventOutcome, IntakeError> {
        let (state, reply) = self.config.policy.on_follow();
        let mut session = Session::new(user_id.clone(), self.clock.now());
        session.state = state;
        self.sessions.put(session);
        info!(user_id = %user_id, "[rx-intake] conversation started (follow)");
        Ok(self.outcome(user_id, reply))
    }

    async fn on_text(&self, user_id: &UserId, content: &str) -> Result<EventOutcome, IntakeError> {
        let current = self.sessions.get(user_id).map(|s| s.state);
        let had_session = current.is_some();

        match self.config.policy.on_text(user_id, current, content) {
            TextTransition::Stay { reply } => {
                if had_session {
                    self.touch(user_id);
                }
                debug!(user_id = %user_id, reply = reply.label(), "[rx-intake] text ignored");
                Ok(self.outcome(user_id, reply))
            }
            TextTransition::Advance { next, reply } => {
                let session = self.commit(user_id, next)?;
                info!(
                    user_id = %user_id,
                    stage = %session.stage(),
                    "[rx-intake] conversation advanced"
                );
                Ok(self.outcome(user_id, reply))
            }
            TextTransition::Finalize { record } => {
                info!(
                    user_id = %user_id,
                    receipt_id = %record.receipt_id,
                    images = record.images.len(),
                    "[rx-intake] finalizing intake"
                );
                let report = self.pipeline.finalize(&record).await;
                self.sessions.delete(user_id);

                let summary = self.config.catalog.summary(&record, &report);
                info!(
                    user_id = %user_id,
                    receipt_id = %record.receipt_id,
                    failed_artifacts = report.failed_artifacts(),
                    "[rx-intake] ✅ intake finalized"
                );
                Ok(EventOutcome {
                    replies: vec![summary],
                    reply: None,
                    stage: None,
                    finalized: Some(record.receipt_id),
                    report: Some(report),
                })
            }
        }
    }

    async fn on_image(
        &self,
        user_id: &UserId,
        message_id: &str,
    ) -> Result<EventOutcome, IntakeError> {
        let current = self.sessions.get(user_id).map(|s| s.state);

        let (index, receipt_id) = match self.config.policy.plan_image(current.as_ref()) {
            ImagePlan::Reject { reply } => {
                if current.is_some() {
                    self.touch(user_id);
                }
                info!(
                    user_id = %user_id,
                    reply = reply.label(),
                    "[rx-intake] image refused"
                );
                return Ok(self.outcome(user_id, reply));
            }
            ImagePlan::Accept { index, receipt_id } => (index, receipt_id),
        };

        let bytes = match self.messaging.fetch_content(message_id).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(user_id = %user_id, step = err.step(), "[rx-intake] {}", err);
                return Ok(self.outcome(user_id, ReplyKind::ImageFailed));
            }
        };

        let receipt_id = match receipt_id {
            Some(id) => id,
            None => {
                let id = self.receipts.allocate()?;
                info!(user_id = %user_id, receipt_id = %id, "[rx-intake] receipt allocated");
                id
            }
        };

        let path = match self.images.save(&artifact_stem(&receipt_id, index), &bytes).await {
            Ok(path) => path,
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    receipt_id = %receipt_id,
                    step = err.step(),
                    "[rx-intake] {}",
                    err
                );
                return Ok(self.outcome(user_id, ReplyKind::ImageFailed));
            }
        };

        let image = StoredImage {
            index,
            path,
            message_id: message_id.to_string(),
            size_bytes: bytes.len(),
        };
        let (next, reply) = self.config.policy.apply_image(current, receipt_id, image);
        self.commit(user_id, next)?;

        info!(
            user_id = %user_id,
            receipt_id = %receipt_id,
            index,
            size_bytes = bytes.len(),
            "[rx-intake] 📸 image stored"
        );
        Ok(self.outcome(user_id, reply))
    }
}

#[async_trait]
impl IntakeApi for IntakeService {
    async fn handle_event(&self, event: InboundEvent) -> EventOutcome {
        let user_id = event.user_id;
        let kind = event.kind.name();

        let lock = self.user_lock(&user_id);
        let outcome = {
            let _guard = lock.lock().await;
            let result = match &event.kind {
                EventKind::Follow => self.on_follow(&user_id),
                EventKind::Text { content } => self.on_text(&user_id, content).await,
                EventKind::Image { message_id } => self.on_image(&user_id, message_id).await,
            };
            result.unwrap_or_else(|err| {
                error!(
                    user_id = %user_id,
                    event = kind,
                    "[rx-intake] event handling failed: {}",
                    err
                );
                self.outcome(&user_id, ReplyKind::SystemError)
            })
        };
        drop(lock);
        self.release_user_lock(&user_id);

        outcome
    }

    fn purge_idle_sessions(&self) -> usize {
        let Ok(idle) = chrono::Duration::from_std(self.config.session_idle_timeout) else {
            return 0;
        };
        let Some(cutoff) = self.clock.now().checked_sub_signed(idle) else {
            return 0;
        };
        // Users with an event in flight hold a lock entry; their handler owns the session.
        let purged = self
            .sessions
            .purge_idle(cutoff, &|user_id| self.user_locks.contains_key(user_id));
        if !purged.is_empty() {
            info!(count = purged.len(), "[rx-intake] purged idle sessions");
        }
        purged.len()
    }

    fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
