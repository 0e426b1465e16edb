//! Production adapters for the intake's outbound ports.

mod drive;
mod line;
mod printer;

pub use drive::{GoogleDriveStorage, DRIVE_UPLOAD_URL};
pub use line::{LineMessagingClient, LINE_API_BASE, LINE_DATA_API_BASE, MAX_REPLY_MESSAGES};
pub use printer::CommandPrintSpooler;

use std::time::Duration;
use thiserror::Error;

/// Adapter construction errors.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// HTTP client with the configured timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, AdapterError> {
    reqwest::Client::builder()
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .timeout(timeout)
        .build()
        .map_err(|err| AdapterError::HttpClient(err.to_string()))
}
