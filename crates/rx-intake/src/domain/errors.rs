//! # Domain Errors
//!
//! Error types for the intake core.
//!
//! ## Design Principles
//!
//! - Collaborator failures are values, caught where the call is made
//! - Nothing here is allowed to take the process down
//! - Configuration problems are the only fatal category (see the runtime crate)

use crate::domain::entities::UserId;
use std::path::PathBuf;
use thiserror::Error;

/// Receipt number allocation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    /// The clock could not produce a calendar date.
    #[error("clock unavailable: {0}")]
    ClockUnavailable(String),
}

/// Session store failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No live session for this user.
    #[error("no session for user {user_id}")]
    NotFound { user_id: UserId },
}

/// Failure of an external collaborator (chat platform, storage, renderer, printer).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("failed to fetch content for message {message_id}: {reason}")]
    ContentFetch { message_id: String, reason: String },

    #[error("failed to write {path}: {reason}")]
    LocalWrite { path: PathBuf, reason: String },

    #[error("failed to read {path}: {reason}")]
    LocalRead { path: PathBuf, reason: String },

    #[error("captured image missing at {path}")]
    MissingLocalFile { path: PathBuf },

    #[error("failed to upload {name}: {reason}")]
    Upload { name: String, reason: String },

    #[error("failed to render {path}: {reason}")]
    Render { path: PathBuf, reason: String },

    #[error("failed to print {path} on {printer}: {reason}")]
    Print {
        path: PathBuf,
        printer: String,
        reason: String,
    },

    #[error("failed to send reply: {reason}")]
    Reply { reason: String },
}

impl CollaboratorError {
    /// Short step label used in logs and metrics.
    pub fn step(&self) -> &'static str {
        match self {
            CollaboratorError::ContentFetch { .. } => "content_fetch",
            CollaboratorError::LocalWrite { .. } => "local_write",
            CollaboratorError::LocalRead { .. } => "local_read",
            CollaboratorError::MissingLocalFile { .. } => "local_check",
            CollaboratorError::Upload { .. } => "upload",
            CollaboratorError::Render { .. } => "render",
            CollaboratorError::Print { .. } => "print",
            CollaboratorError::Reply { .. } => "reply",
        }
    }
}

/// Errors surfaced while handling one event.
///
/// These never escape the intake service: they are logged and turned into an
/// apology reply for the affected user only.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}
