//! # Ports Layer
//!
//! ## Hexagonal Architecture
//!
//! - `inbound.rs` - Driving port (what the webhook dispatcher calls)
//! - `outbound.rs` - Driven ports (collaborators the service needs)

pub mod inbound;
pub mod outbound;
