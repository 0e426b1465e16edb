//! # Outbound Ports (Driven Ports)
//!
//! Collaborators the intake service needs from the host application.
//!
//! Production adapters live in `rx-runtime` (chat platform, Drive, printer)
//! and in `crate::adapters` (memory session store, local files, PDF, clock).
//! Test fakes live in `crate::test_utils`.

use crate::domain::entities::{OutboundMessage, Session, UserId};
use crate::domain::errors::{CollaboratorError, ReceiptError, SessionError};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Wall-clock source (local time zone).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    /// Calendar date used for receipt numbering.
    fn today(&self) -> Result<NaiveDate, ReceiptError> {
        Ok(self.now().date_naive())
    }
}

/// Field-setting mutation applied by [`SessionStore::update`].
pub type SessionMutation<'a> = Box<dyn FnOnce(&mut Session) + Send + 'a>;

/// Keyed storage of in-progress conversations.
///
/// Implementations only need map-level atomicity; per-user serialization of
/// whole event handling is done by the service.
pub trait SessionStore: Send + Sync {
    /// Current session for the user, if any.
    fn get(&self, user_id: &UserId) -> Option<Session>;

    /// Return the existing session, or create an empty one.
    fn create_if_absent(&self, user_id: &UserId, now: DateTime<Local>) -> Session;

    /// Insert or overwrite the user's session.
    fn put(&self, session: Session);

    /// Apply a mutation to an existing session and return the result.
    ///
    /// ## Errors
    ///
    /// - `NotFound`: the user has no live session (nothing is created)
    fn update(&self, user_id: &UserId, mutation: SessionMutation<'_>)
        -> Result<Session, SessionError>;

    /// Remove the session. Returns whether one existed.
    fn delete(&self, user_id: &UserId) -> bool;

    /// Remove sessions last touched before `cutoff`, except those for which
    /// `keep` returns true.
    fn purge_idle(
        &self,
        cutoff: DateTime<Local>,
        keep: &(dyn Fn(&UserId) -> bool + Sync),
    ) -> Vec<UserId>;

    /// Number of live sessions.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Durable local storage for captured images and rendered documents.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Write image bytes as `<stem>.jpg` and return the path.
    async fn save(&self, stem: &str, bytes: &[u8]) -> Result<PathBuf, CollaboratorError>;

    /// Read a previously saved image back.
    async fn load(&self, path: &Path) -> Result<Vec<u8>, CollaboratorError>;

    /// Whether a previously saved file is still present.
    async fn exists(&self, path: &Path) -> bool;

    /// Where the rendered document for `<stem>` goes.
    fn document_path(&self, stem: &str) -> PathBuf;

    /// Highest receipt sequence already on disk for `day`.
    fn highest_sequence(&self, day: NaiveDate) -> Option<u32>;
}

/// Chat platform calls: content download and replies.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Download the binary content of an inbound message.
    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>, CollaboratorError>;

    /// Answer an event through its one-shot reply token.
    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<(), CollaboratorError>;
}

/// One remote upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub bytes: &'a [u8],
    pub name: &'a str,
    pub parent_folder: &'a str,
    pub properties: &'a BTreeMap<String, String>,
}

/// Remote object storage (Google Drive in production).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store the object and return its remote id.
    async fn upload(&self, request: UploadRequest<'_>) -> Result<String, CollaboratorError>;
}

/// Header lines printed above the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub lines: Vec<String>,
}

/// Single-page document renderer.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(
        &self,
        image: &Path,
        header: &DocumentHeader,
        output: &Path,
    ) -> Result<(), CollaboratorError>;
}

/// OS print spooler.
#[async_trait]
pub trait PrintSpooler: Send + Sync {
    async fn print(&self, document: &Path, printer: &str) -> Result<(), CollaboratorError>;
}
