//! # Rx-Intake Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Signed webhook payload builders
//! └── integration/      # End-to-end flows
//!     ├── webhook_flows.rs   # HTTP router → dispatcher → intake → replies
//!     └── artifact_flows.rs  # Real files and PDFs in a temp directory
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rx-tests
//! cargo test -p rx-tests integration::webhook_flows
//!
//! # Benchmarks
//! cargo bench -p rx-tests
//! ```

pub mod fixtures;
pub mod integration;
