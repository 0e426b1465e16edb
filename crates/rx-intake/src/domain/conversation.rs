//! # Conversation State Machine
//!
//! Pure transition logic for one user's intake conversation.
//!
//! ```text
//! AwaitingConsent ──consent phrase──→ AwaitingImage ──image(s)──→ AwaitingImage
//!        │                                  │
//!        └──image (auto-consent)────────────┤
//!                                           ├──"完了"/"done"──→ AwaitingPhone ──text──┐
//!                                           │                                         ↓
//!                                           └──any other text (= phone)──→ AwaitingPickupTime
//!                                                                                     │
//!                                                                          text ──→ Finalize
//! ```
//!
//! Nothing in this module performs I/O. The service asks the machine what to
//! do, performs the side effects (content fetch, receipt allocation, file
//! writes, finalization) and then applies the result.

use crate::domain::entities::{
    ImageBatch, IntakeRecord, ReceiptId, SessionState, StoredImage, UserId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do with an image that arrives before consent was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreConsentImagePolicy {
    /// Treat the photo as implicit consent and accept it.
    #[default]
    AutoConsent,
    /// Refuse the photo and ask for consent first.
    Reject,
}

impl FromStr for PreConsentImagePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto-consent" | "auto_consent" | "auto" => Ok(Self::AutoConsent),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown pre-consent image policy: {other}")),
        }
    }
}

impl fmt::Display for PreConsentImagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoConsent => f.write_str("auto-consent"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

/// Semantic reply chosen by the machine; rendered by the message catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Greeting with the privacy notice and consent request.
    Welcome,
    /// Consent accepted; how-to guide follows.
    ConsentAccepted,
    /// Anything other than a consent phrase before consent.
    ConsentRequired,
    /// Unknown user sent something that cannot start an intake.
    StartOver,
    /// Text while no image has been received yet.
    SendImageFirst,
    /// Image stored; `count` images so far.
    ImageReceived { count: usize },
    /// Late image stored while waiting for the phone number.
    ImageReceivedPhoneNext { count: usize },
    /// Completion keyword received; the phone number is next.
    AskPhone,
    /// Phone stored; pickup time is next.
    AskPickupTime,
    /// Image after the phone number was given.
    ImagesClosed,
    /// Content fetch or local write failed; please resend.
    ImageFailed,
    /// Internal failure unrelated to the user's input.
    SystemError,
}

impl ReplyKind {
    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ReplyKind::Welcome => "welcome",
            ReplyKind::ConsentAccepted => "consent_accepted",
            ReplyKind::ConsentRequired => "consent_required",
            ReplyKind::StartOver => "start_over",
            ReplyKind::SendImageFirst => "send_image_first",
            ReplyKind::ImageReceived { .. } => "image_received",
            ReplyKind::ImageReceivedPhoneNext { .. } => "image_received_phone_next",
            ReplyKind::AskPhone => "ask_phone",
            ReplyKind::AskPickupTime => "ask_pickup_time",
            ReplyKind::ImagesClosed => "images_closed",
            ReplyKind::ImageFailed => "image_failed",
            ReplyKind::SystemError => "system_error",
        }
    }
}

/// Outcome of a text event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextTransition {
    /// State unchanged (or no session and none created).
    Stay { reply: ReplyKind },
    /// Move to `next` (creating the session if there was none).
    Advance { next: SessionState, reply: ReplyKind },
    /// Terminal: run finalization for `record`, then delete the session.
    Finalize { record: IntakeRecord },
}

/// Decision for an image event, taken before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePlan {
    /// Do not fetch or store anything.
    Reject { reply: ReplyKind },
    /// Fetch and store the image as `index`; allocate a receipt id if `receipt_id` is `None`.
    Accept {
        index: u32,
        receipt_id: Option<ReceiptId>,
    },
}

/// Conversation rules: consent phrases, completion keywords and policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationPolicy {
    pub pre_consent_images: PreConsentImagePolicy,
    consent_phrases: Vec<String>,
    completion_keywords: Vec<String>,
}

impl Default for ConversationPolicy {
    fn default() -> Self {
        Self::new(PreConsentImagePolicy::default())
    }
}

impl ConversationPolicy {
    /// Phrases accepted as consent (matched case-insensitively, exact membership).
    pub const CONSENT_PHRASES: [&'static str; 4] = ["同意", "はい", "ok", "了解"];

    /// Phrases that close image collection without being a phone number.
    pub const COMPLETION_KEYWORDS: [&'static str; 4] = ["完了", "次へ", "done", "next"];

    pub fn new(pre_consent_images: PreConsentImagePolicy) -> Self {
        Self {
            pre_consent_images,
            consent_phrases: Self::CONSENT_PHRASES.iter().map(|p| p.to_lowercase()).collect(),
            completion_keywords: Self::COMPLETION_KEYWORDS
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    pub fn is_consent(&self, text: &str) -> bool {
        let normalized = normalize(text).to_lowercase();
        self.consent_phrases.iter().any(|p| *p == normalized)
    }

    pub fn is_completion(&self, text: &str) -> bool {
        let normalized = normalize(text).to_lowercase();
        self.completion_keywords.iter().any(|p| *p == normalized)
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// A follow (friend-add) always starts a fresh conversation.
    pub fn on_follow(&self) -> (SessionState, ReplyKind) {
        (SessionState::AwaitingConsent, ReplyKind::Welcome)
    }

    /// Interpret one text message against the current state.
    pub fn on_text(
        &self,
        user_id: &UserId,
        state: Option<SessionState>,
        text: &str,
    ) -> TextTransition {
        let text = normalize(text);

        match state {
            None => {
                if self.is_consent(text) {
                    TextTransition::Advance {
                        next: SessionState::AwaitingImage { batch: None },
                        reply: ReplyKind::ConsentAccepted,
                    }
                } else {
                    TextTransition::Stay {
                        reply: ReplyKind::StartOver,
                    }
                }
            }

            Some(SessionState::AwaitingConsent) => {
                if self.is_consent(text) {
                    TextTransition::Advance {
                        next: SessionState::AwaitingImage { batch: None },
                        reply: ReplyKind::ConsentAccepted,
                    }
                } else {
                    TextTransition::Stay {
                        reply: ReplyKind::ConsentRequired,
                    }
                }
            }

            Some(SessionState::AwaitingImage { batch: None }) => TextTransition::Stay {
                reply: ReplyKind::SendImageFirst,
            },

            Some(SessionState::AwaitingImage { batch: Some(batch) }) => {
                if self.is_completion(text) {
                    TextTransition::Advance {
                        next: SessionState::AwaitingPhone { batch },
                        reply: ReplyKind::AskPhone,
                    }
                } else {
                    TextTransition::Advance {
                        next: SessionState::AwaitingPickupTime {
                            batch,
                            phone: text.to_string(),
                        },
                        reply: ReplyKind::AskPickupTime,
                    }
                }
            }

            Some(SessionState::AwaitingPhone { batch }) => TextTransition::Advance {
                next: SessionState::AwaitingPickupTime {
                    batch,
                    phone: text.to_string(),
                },
                reply: ReplyKind::AskPickupTime,
            },

            Some(SessionState::AwaitingPickupTime { batch, phone }) => TextTransition::Finalize {
                record: IntakeRecord {
                    user_id: user_id.clone(),
                    receipt_id: *batch.receipt_id(),
                    images: batch.into_images(),
                    phone,
                    pickup_time: text.to_string(),
                },
            },
        }
    }

    /// Decide whether an image can be taken in the current state.
    pub fn plan_image(&self, state: Option<&SessionState>) -> ImagePlan {
        match state {
            None | Some(SessionState::AwaitingConsent) => match self.pre_consent_images {
                PreConsentImagePolicy::AutoConsent => ImagePlan::Accept {
                    index: 1,
                    receipt_id: None,
                },
                PreConsentImagePolicy::Reject => ImagePlan::Reject {
                    reply: ReplyKind::ConsentRequired,
                },
            },
            Some(SessionState::AwaitingImage { batch: None }) => ImagePlan::Accept {
                index: 1,
                receipt_id: None,
            },
            Some(SessionState::AwaitingImage { batch: Some(batch) })
            | Some(SessionState::AwaitingPhone { batch }) => ImagePlan::Accept {
                index: batch.next_index(),
                receipt_id: Some(*batch.receipt_id()),
            },
            Some(SessionState::AwaitingPickupTime { .. }) => ImagePlan::Reject {
                reply: ReplyKind::ImagesClosed,
            },
        }
    }

    /// Fold an accepted, stored image into the state.
    ///
    /// `receipt_id` is only used when the state has no batch yet; an existing
    /// batch keeps its own id.
    pub fn apply_image(
        &self,
        state: Option<SessionState>,
        receipt_id: ReceiptId,
        image: StoredImage,
    ) -> (SessionState, ReplyKind) {
        match state {
            Some(SessionState::AwaitingImage {
                batch: Some(mut batch),
            }) => {
                batch.push(image);
                let count = batch.len();
                (
                    SessionState::AwaitingImage { batch: Some(batch) },
                    ReplyKind::ImageReceived { count },
                )
            }
            Some(SessionState::AwaitingPhone { mut batch }) => {
                batch.push(image);
                let count = batch.len();
                (
                    SessionState::AwaitingPhone { batch },
                    ReplyKind::ImageReceivedPhoneNext { count },
                )
            }
            // A finished phone step never reaches here (plan_image rejects it);
            // keep the state intact if it does.
            Some(state @ SessionState::AwaitingPickupTime { .. }) => {
                (state, ReplyKind::ImagesClosed)
            }
            None
            | Some(SessionState::AwaitingConsent)
            | Some(SessionState::AwaitingImage { batch: None }) => (
                SessionState::AwaitingImage {
                    batch: Some(ImageBatch::new(receipt_id, image)),
                },
                ReplyKind::ImageReceived { count: 1 },
            ),
        }
    }
}

/// Trim surrounding whitespace (including full-width spaces).
pub fn normalize(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\u{3000}')
}
