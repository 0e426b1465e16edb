//! # Adapters Module
//!
//! In-process implementations of the outbound ports.
//!
//! ## Modules
//!
//! - `memory`: session store in a `HashMap`
//! - `filesystem`: image and document files in a local directory
//! - `pdf`: single-page PDF rendering
//! - `clock`: wall clock and a settable clock

pub mod clock;
pub mod filesystem;
pub mod memory;
pub mod pdf;

pub use clock::{ManualClock, SystemClock};
pub use filesystem::LocalImageStore;
pub use memory::InMemorySessionStore;
pub use pdf::PdfDocumentRenderer;
