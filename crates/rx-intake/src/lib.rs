//! # Prescription Intake Core (rx-intake)
//!
//! Walks each chat user through consent → prescription photo(s) → phone
//! number → pickup time, numbers the intake with a daily receipt id and
//! persists every photo as a local file, an optional remote upload, a printable
//! single-page PDF and an optional print job.
//!
//! ## Architecture
//!
//! ```text
//! Webhook dispatcher ──InboundEvent──→ IntakeService ──→ ConversationPolicy (pure)
//!                                          │
//!                 ┌────────────────────────┼───────────────────────┐
//!                 ↓                        ↓                       ↓
//!           SessionStore          ReceiptIdGenerator        ArtifactPipeline
//!                                                      (ImageStore, ObjectStorage,
//!                                                    DocumentRenderer, PrintSpooler)
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Fill order | consent → image(s) → phone → pickup time, enforced by `SessionState` |
//! | One receipt per intake | assigned with the first image, stable afterwards |
//! | Daily numbering | `YYYYMMDD` + 4-digit sequence, reset on the first allocation of a new day |
//! | Unique ids | allocation is serialized; same-day ids strictly increase |
//! | Single finalization | the session is deleted before the summary is returned |
//! | Per-user ordering | events of one user never interleave |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Pure domain logic (entities, state machine, layout, messages)
//! - `ports/` - Port traits (inbound API, outbound collaborators)
//! - `adapters/` - In-process adapters (memory sessions, local files, PDF, clock)
//! - `service/` - Application service and artifact pipeline
//!
//! ## Usage
//!
//! ```ignore
//! use rx_intake::{IntakeApi, InboundEvent, IntakeService};
//!
//! let service = IntakeService::new(deps, IntakeConfig::default());
//! let outcome = service.handle_event(InboundEvent::text("U123", "同意")).await;
//! for message in &outcome.replies { /* send through the reply token */ }
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Domain
pub use domain::artifact::{ArtifactMetadata, ArtifactReport, FinalizationReport, StepOutcome};
pub use domain::conversation::{
    ConversationPolicy, ImagePlan, PreConsentImagePolicy, ReplyKind, TextTransition,
};
pub use domain::entities::{
    artifact_stem, EventKind, ImageBatch, InboundEvent, IntakeRecord, OutboundMessage, ReceiptId,
    Session, SessionState, Stage, StoredImage, UserId,
};
pub use domain::errors::{CollaboratorError, IntakeError, ReceiptError, SessionError};
pub use domain::layout::{PageLayout, Placement};
pub use domain::messages::{MessageCatalog, DEFAULT_GUIDE_IMAGE_URL};
pub use domain::receipt::ReceiptCounter;

// Ports
pub use ports::inbound::{EventOutcome, IntakeApi};
pub use ports::outbound::{
    Clock, DocumentHeader, DocumentRenderer, ImageStore, MessagingClient, ObjectStorage,
    PrintSpooler, SessionStore, UploadRequest,
};

// Adapters
pub use adapters::{
    InMemorySessionStore, LocalImageStore, ManualClock, PdfDocumentRenderer, SystemClock,
};

// Service
pub use service::{
    ArtifactPipeline, IntakeConfig, IntakeDependencies, IntakeService, PrintTarget,
    ReceiptIdGenerator, UploadTarget,
};
