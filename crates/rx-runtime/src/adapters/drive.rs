//! Google Drive upload.
//!
//! Uses the single-request multipart upload: a `multipart/related` body
//! with the JSON metadata part followed by the JPEG part.

use super::{http_client, AdapterError};
use async_trait::async_trait;
use reqwest::Client;
use rx_intake::{CollaboratorError, ObjectStorage, UploadRequest};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DRIVE_UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&supportsAllDrives=true";

const BOUNDARY: &str = "rx-intake-7f3c9a1e5d2b4086";

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Drive v3 file uploads with a bearer access token.
pub struct GoogleDriveStorage {
    client: Client,
    access_token: String,
    upload_url: String,
}

impl GoogleDriveStorage {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Result<Self, AdapterError> {
        Ok(Self {
            client: http_client(timeout)?,
            access_token: access_token.into(),
            upload_url: DRIVE_UPLOAD_URL.to_string(),
        })
    }

    pub fn with_upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = url.into();
        self
    }
}

/// Build the `multipart/related` body for one upload.
fn related_body(request: &UploadRequest<'_>) -> Vec<u8> {
    let metadata = json!({
        "name": request.name,
        "parents": [request.parent_folder],
        "properties": request.properties,
        "mimeType": "image/jpeg",
    });

    let mut body = Vec::with_capacity(request.bytes.len() + 512);
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(request.bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[async_trait]
impl ObjectStorage for GoogleDriveStorage {
    async fn upload(&self, request: UploadRequest<'_>) -> Result<String, CollaboratorError> {
        let fail = |reason: String| CollaboratorError::Upload {
            name: request.name.to_string(),
            reason,
        };

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(related_body(&request))
            .send()
            .await
            .map_err(|err| fail(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fail(format!("status {status}: {body}")));
        }

        let created: CreatedFile = response.json().await.map_err(|err| fail(err.to_string()))?;
        Ok(created.id)
    }
}
