//! # Domain Layer
//!
//! Pure domain logic for prescription intake. No I/O happens here.
//!
//! ## Modules
//!
//! - `entities` - Identifiers, sessions, images, events and replies
//! - `receipt` - Per-day receipt sequence
//! - `conversation` - Consent → image(s) → phone → pickup-time state machine
//! - `messages` - User-facing reply texts
//! - `artifact` - Per-image metadata and pipeline outcomes
//! - `layout` - Single-page document geometry
//! - `errors` - Domain error types

pub mod artifact;
pub mod conversation;
pub mod entities;
pub mod errors;
pub mod layout;
pub mod messages;
pub mod receipt;
