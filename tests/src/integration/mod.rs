//! Cross-crate flows.

pub mod artifact_flows;
pub mod webhook_flows;
