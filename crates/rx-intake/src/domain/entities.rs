//! # Domain Entities
//!
//! Value types shared by the conversation machine, the session store and the
//! artifact pipeline.
//!
//! ## Session Shape
//!
//! A session's progress is an explicit [`SessionState`] tag. Each variant only
//! carries the fields that are legal at that point of the conversation, so the
//! fill order consent → image(s) → phone → pickup time is enforced by the type
//! system instead of by checking which keys happen to be present.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque, stable identifier of the chat counterpart (supplied by the transport).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Human-readable receipt number: `<YYYYMMDD><sequence:04>`.
///
/// Ordering follows `(day, sequence)`, which matches allocation order.
///
/// The string form only sorts in that order up to sequence 9999; past it the
/// sequence widens and `"2024061410000" < "202406149999"` as strings. Compare
/// parsed `ReceiptId`s, never their text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiptId {
    day: NaiveDate,
    sequence: u32,
}

impl ReceiptId {
    /// Number of digits the sequence is zero-padded to.
    pub const SEQUENCE_WIDTH: usize = 4;

    pub fn new(day: NaiveDate, sequence: u32) -> Self {
        Self { day, sequence }
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:0width$}",
            self.day.format("%Y%m%d"),
            self.sequence,
            width = Self::SEQUENCE_WIDTH
        )
    }
}

impl FromStr for ReceiptId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 8 + Self::SEQUENCE_WIDTH || !s.is_ascii() {
            return Err(format!("receipt id too short: {s}"));
        }
        let (day, sequence) = s.split_at(8);
        let day = NaiveDate::parse_from_str(day, "%Y%m%d")
            .map_err(|e| format!("invalid receipt day in {s}: {e}"))?;
        if !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("invalid receipt sequence in {s}"));
        }
        let sequence = sequence
            .parse()
            .map_err(|e| format!("invalid receipt sequence in {s}: {e}"))?;
        Ok(Self { day, sequence })
    }
}

impl Serialize for ReceiptId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReceiptId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// File stem shared by every artifact of one image: `<receipt_id>_<index>`.
pub fn artifact_stem(receipt_id: &ReceiptId, index: u32) -> String {
    format!("{receipt_id}_{index}")
}

// =============================================================================
// IMAGES
// =============================================================================

/// One captured prescription image, already written to local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    /// 1-based position within the receipt.
    pub index: u32,
    /// Local file holding the raw bytes.
    pub path: PathBuf,
    /// Transport message id the bytes were fetched from.
    pub message_id: String,
    pub size_bytes: usize,
}

/// The receipt id together with its images.
///
/// Non-empty by construction: a batch only comes into existence with its first
/// image and is append-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBatch {
    receipt_id: ReceiptId,
    images: Vec<StoredImage>,
}

impl ImageBatch {
    pub fn new(receipt_id: ReceiptId, first: StoredImage) -> Self {
        Self {
            receipt_id,
            images: vec![first],
        }
    }

    pub fn receipt_id(&self) -> &ReceiptId {
        &self.receipt_id
    }

    pub fn images(&self) -> &[StoredImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Index the next appended image will get.
    pub fn next_index(&self) -> u32 {
        self.images.len() as u32 + 1
    }

    pub fn push(&mut self, image: StoredImage) {
        self.images.push(image);
    }

    pub fn into_images(self) -> Vec<StoredImage> {
        self.images
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Conversation progress, with the fields legal in each step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for an affirmative consent phrase.
    AwaitingConsent,
    /// Consent given; collecting one or more images.
    AwaitingImage { batch: Option<ImageBatch> },
    /// Images collected; the next text is the phone number.
    AwaitingPhone { batch: ImageBatch },
    /// Phone stored; the next text is the pickup time and finalizes.
    AwaitingPickupTime { batch: ImageBatch, phone: String },
}

impl SessionState {
    pub fn stage(&self) -> Stage {
        match self {
            SessionState::AwaitingConsent => Stage::AwaitingConsent,
            SessionState::AwaitingImage { .. } => Stage::AwaitingImage,
            SessionState::AwaitingPhone { .. } => Stage::AwaitingPhone,
            SessionState::AwaitingPickupTime { .. } => Stage::AwaitingPickupTime,
        }
    }

    pub fn batch(&self) -> Option<&ImageBatch> {
        match self {
            SessionState::AwaitingConsent => None,
            SessionState::AwaitingImage { batch } => batch.as_ref(),
            SessionState::AwaitingPhone { batch }
            | SessionState::AwaitingPickupTime { batch, .. } => Some(batch),
        }
    }
}

/// Fieldless view of [`SessionState`] for logging, metrics and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AwaitingConsent,
    AwaitingImage,
    AwaitingPhone,
    AwaitingPickupTime,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::AwaitingConsent => "awaiting_consent",
            Stage::AwaitingImage => "awaiting_image",
            Stage::AwaitingPhone => "awaiting_phone",
            Stage::AwaitingPickupTime => "awaiting_pickup_time",
        };
        f.write_str(name)
    }
}

/// One user's in-progress intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub state: SessionState,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl Session {
    /// Fresh session waiting for consent.
    pub fn new(user_id: UserId, now: DateTime<Local>) -> Self {
        Self {
            user_id,
            state: SessionState::AwaitingConsent,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn consent_given(&self) -> bool {
        !matches!(self.state, SessionState::AwaitingConsent)
    }

    pub fn receipt_id(&self) -> Option<&ReceiptId> {
        self.state.batch().map(ImageBatch::receipt_id)
    }

    pub fn images(&self) -> &[StoredImage] {
        self.state.batch().map(ImageBatch::images).unwrap_or(&[])
    }

    pub fn phone(&self) -> Option<&str> {
        match &self.state {
            SessionState::AwaitingPickupTime { phone, .. } => Some(phone),
            _ => None,
        }
    }
}

/// Everything collected by a completed conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeRecord {
    pub user_id: UserId,
    pub receipt_id: ReceiptId,
    pub images: Vec<StoredImage>,
    pub phone: String,
    pub pickup_time: String,
}

// =============================================================================
// EVENTS AND REPLIES
// =============================================================================

/// Inbound event kinds understood by the conversation machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Follow,
    Image { message_id: String },
    Text { content: String },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Follow => "follow",
            EventKind::Image { .. } => "image",
            EventKind::Text { .. } => "text",
        }
    }
}

/// One inbound event for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user_id: UserId,
    pub kind: EventKind,
}

impl InboundEvent {
    pub fn follow(user_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            kind: EventKind::Follow,
        }
    }

    pub fn image(user_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            kind: EventKind::Image {
                message_id: message_id.into(),
            },
        }
    }

    pub fn text(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            kind: EventKind::Text {
                content: content.into(),
            },
        }
    }
}

/// Outbound chat message. Serializes to the LINE message object shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "originalContentUrl")]
        original_url: String,
        #[serde(rename = "previewImageUrl")]
        preview_url: String,
    },
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        OutboundMessage::Text { text: text.into() }
    }

    /// Image message whose preview is the original itself.
    pub fn image(url: impl Into<String>) -> Self {
        let url = url.into();
        OutboundMessage::Image {
            preview_url: url.clone(),
            original_url: url,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OutboundMessage::Text { text } => Some(text),
            OutboundMessage::Image { .. } => None,
        }
    }
}
