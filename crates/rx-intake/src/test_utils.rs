//! # Test Utilities
//!
//! In-memory fakes for every outbound port, with failure injection, and a
//! harness wiring them into an [`IntakeService`].
//!
//! Requires feature: `test-utils` (always on for this crate's own tests).

use crate::adapters::{InMemorySessionStore, ManualClock};
use crate::domain::entities::{InboundEvent, OutboundMessage, UserId};
use crate::domain::errors::CollaboratorError;
use crate::ports::inbound::{EventOutcome, IntakeApi};
use crate::ports::outbound::{
    DocumentHeader, DocumentRenderer, ImageStore, MessagingClient, ObjectStorage, PrintSpooler,
    SessionStore, UploadRequest,
};
use crate::service::{IntakeConfig, IntakeDependencies, IntakeService, PrintTarget, UploadTarget};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Minimal JPEG stream (SOI, APP0, SOF0, EOI) of the given pixel size.
pub fn sample_jpeg(width: u16, height: u16) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    bytes.extend_from_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
    bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&[0x03, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}

/// 2024-06-14 10:00 local time.
pub fn test_now() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 6, 14, 10, 0, 0)
        .single()
        .unwrap_or_else(Local::now)
}

pub fn test_day() -> NaiveDate {
    test_now().date_naive()
}

/// Sleep for `delay`, or just yield to the scheduler when it is zero.
async fn pause(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}

// =============================================================================
// MESSAGING
// =============================================================================

/// One recorded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReply {
    pub reply_token: String,
    pub messages: Vec<OutboundMessage>,
}

/// Chat platform fake. Any message id yields [`sample_jpeg`] unless overridden.
#[derive(Debug, Default)]
pub struct FakeMessagingClient {
    contents: Mutex<HashMap<String, Vec<u8>>>,
    failing_ids: Mutex<HashSet<String>>,
    fail_replies: AtomicBool,
    replies: Mutex<Vec<SentReply>>,
    fetched: Mutex<Vec<String>>,
    fetch_delay: Mutex<Duration>,
}

impl FakeMessagingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_content(&self, message_id: &str, bytes: Vec<u8>) {
        self.contents.lock().insert(message_id.to_string(), bytes);
    }

    pub fn fail_fetch_for(&self, message_id: &str) {
        self.failing_ids.lock().insert(message_id.to_string());
    }

    pub fn set_fail_replies(&self, fail: bool) {
        self.fail_replies.store(fail, Ordering::SeqCst);
    }

    /// Make every content fetch sleep before answering.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = delay;
    }

    pub fn replies(&self) -> Vec<SentReply> {
        self.replies.lock().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl MessagingClient for FakeMessagingClient {
    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>, CollaboratorError> {
        self.fetched.lock().push(message_id.to_string());
        let delay = *self.fetch_delay.lock();
        pause(delay).await;
        if self.failing_ids.lock().contains(message_id) {
            return Err(CollaboratorError::ContentFetch {
                message_id: message_id.to_string(),
                reason: "injected failure".into(),
            });
        }
        Ok(self
            .contents
            .lock()
            .get(message_id)
            .cloned()
            .unwrap_or_else(|| sample_jpeg(600, 800)))
    }

    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<(), CollaboratorError> {
        if self.fail_replies.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Reply {
                reason: "injected failure".into(),
            });
        }
        self.replies.lock().push(SentReply {
            reply_token: reply_token.to_string(),
            messages: messages.to_vec(),
        });
        Ok(())
    }
}

// =============================================================================
// LOCAL STORAGE
// =============================================================================

/// Image store keeping files in a map under a virtual `/mem` directory.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Simulate a file vanishing from disk.
    pub fn remove(&self, path: &Path) -> bool {
        self.files.lock().remove(path).is_some()
    }

    /// Stored file names, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .files
            .lock()
            .keys()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn save(&self, stem: &str, bytes: &[u8]) -> Result<PathBuf, CollaboratorError> {
        let path = PathBuf::from(format!("/mem/{stem}.jpg"));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CollaboratorError::LocalWrite {
                path,
                reason: "injected failure".into(),
            });
        }
        self.files.lock().insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    async fn load(&self, path: &Path) -> Result<Vec<u8>, CollaboratorError> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| CollaboratorError::LocalRead {
                path: path.to_path_buf(),
                reason: "not found".into(),
            })
    }

    async fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    fn document_path(&self, stem: &str) -> PathBuf {
        PathBuf::from(format!("/mem/{stem}.pdf"))
    }

    fn highest_sequence(&self, day: NaiveDate) -> Option<u32> {
        let prefix = day.format("%Y%m%d").to_string();
        self.file_names()
            .iter()
            .filter_map(|name| name.split_once('_').map(|(rid, _)| rid.to_string()))
            .filter(|rid| rid.starts_with(&prefix))
            .filter_map(|rid| rid[prefix.len()..].parse().ok())
            .max()
    }
}

// =============================================================================
// PIPELINE COLLABORATORS
// =============================================================================

/// One recorded upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub name: String,
    pub parent_folder: String,
    pub properties: BTreeMap<String, String>,
    pub size: usize,
}

/// Object storage fake.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    uploads: Mutex<Vec<RecordedUpload>>,
    fail: AtomicBool,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn upload(&self, request: UploadRequest<'_>) -> Result<String, CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Upload {
                name: request.name.to_string(),
                reason: "injected failure".into(),
            });
        }
        let mut uploads = self.uploads.lock();
        uploads.push(RecordedUpload {
            name: request.name.to_string(),
            parent_folder: request.parent_folder.to_string(),
            properties: request.properties.clone(),
            size: request.bytes.len(),
        });
        Ok(format!("object-{}", uploads.len()))
    }
}

/// Renderer fake recording `(image, header, output)`.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    rendered: Mutex<Vec<(PathBuf, DocumentHeader, PathBuf)>>,
    fail: AtomicBool,
    delay: Mutex<Duration>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn rendered(&self) -> Vec<(PathBuf, DocumentHeader, PathBuf)> {
        self.rendered.lock().clone()
    }

    /// Make every render sleep before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }
}

#[async_trait]
impl DocumentRenderer for RecordingRenderer {
    async fn render(
        &self,
        image: &Path,
        header: &DocumentHeader,
        output: &Path,
    ) -> Result<(), CollaboratorError> {
        let delay = *self.delay.lock();
        pause(delay).await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Render {
                path: output.to_path_buf(),
                reason: "injected failure".into(),
            });
        }
        self.rendered
            .lock()
            .push((image.to_path_buf(), header.clone(), output.to_path_buf()));
        Ok(())
    }
}

/// Print spooler fake recording `(document, printer)`.
#[derive(Debug, Default)]
pub struct RecordingSpooler {
    printed: Mutex<Vec<(PathBuf, String)>>,
    fail: AtomicBool,
}

impl RecordingSpooler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn printed(&self) -> Vec<(PathBuf, String)> {
        self.printed.lock().clone()
    }
}

#[async_trait]
impl PrintSpooler for RecordingSpooler {
    async fn print(&self, document: &Path, printer: &str) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Print {
                path: document.to_path_buf(),
                printer: printer.to_string(),
                reason: "injected failure".into(),
            });
        }
        self.printed
            .lock()
            .push((document.to_path_buf(), printer.to_string()));
        Ok(())
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// Folder id used by the harness upload target.
pub const TEST_FOLDER: &str = "folder-123";
/// Printer name used by the harness print target.
pub const TEST_PRINTER: &str = "front-desk";

/// An [`IntakeService`] wired to fakes, with handles to every fake.
pub struct TestHarness {
    pub service: Arc<IntakeService>,
    pub sessions: Arc<InMemorySessionStore>,
    pub clock: Arc<ManualClock>,
    pub messaging: Arc<FakeMessagingClient>,
    pub images: Arc<MemoryImageStore>,
    pub storage: Arc<RecordingStorage>,
    pub renderer: Arc<RecordingRenderer>,
    pub spooler: Arc<RecordingSpooler>,
}

impl TestHarness {
    /// Upload and print enabled, default conversation policy.
    pub fn new() -> Self {
        Self::with_config(IntakeConfig::default())
    }

    pub fn with_config(config: IntakeConfig) -> Self {
        Self::build(config, MemoryImageStore::new())
    }

    /// Harness whose image store already holds `files` (for restart seeding).
    pub fn with_existing_files(files: &[&str]) -> Self {
        let images = MemoryImageStore::new();
        for name in files {
            images
                .files
                .lock()
                .insert(PathBuf::from(format!("/mem/{name}")), vec![0]);
        }
        Self::build(IntakeConfig::default(), images)
    }

    fn build(config: IntakeConfig, images: MemoryImageStore) -> Self {
        let sessions = Arc::new(InMemorySessionStore::new());
        let clock = Arc::new(ManualClock::new(test_now()));
        let messaging = Arc::new(FakeMessagingClient::new());
        let images = Arc::new(images);
        let storage = Arc::new(RecordingStorage::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let spooler = Arc::new(RecordingSpooler::new());

        let deps = IntakeDependencies {
            sessions: sessions.clone(),
            clock: clock.clone(),
            messaging: messaging.clone(),
            images: images.clone(),
            renderer: renderer.clone(),
            upload: Some(UploadTarget {
                storage: storage.clone(),
                parent_folder: TEST_FOLDER.to_string(),
            }),
            print: Some(PrintTarget {
                spooler: spooler.clone(),
                printer: TEST_PRINTER.to_string(),
            }),
        };

        Self {
            service: Arc::new(IntakeService::new(deps, config)),
            sessions,
            clock,
            messaging,
            images,
            storage,
            renderer,
            spooler,
        }
    }

    pub async fn follow(&self, user: &str) -> EventOutcome {
        self.service.handle_event(InboundEvent::follow(user)).await
    }

    pub async fn text(&self, user: &str, text: &str) -> EventOutcome {
        self.service.handle_event(InboundEvent::text(user, text)).await
    }

    pub async fn image(&self, user: &str, message_id: &str) -> EventOutcome {
        self.service
            .handle_event(InboundEvent::image(user, message_id))
            .await
    }

    pub fn has_session(&self, user: &str) -> bool {
        self.sessions.get(&UserId::from(user)).is_some()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
