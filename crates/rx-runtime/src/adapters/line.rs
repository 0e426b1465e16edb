//! LINE Messaging API client.

use super::{http_client, AdapterError};
use async_trait::async_trait;
use reqwest::Client;
use rx_intake::{CollaboratorError, MessagingClient, OutboundMessage};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

pub const LINE_API_BASE: &str = "https://api.line.me";
pub const LINE_DATA_API_BASE: &str = "https://api-data.line.me";

/// The platform accepts at most this many messages per reply token.
pub const MAX_REPLY_MESSAGES: usize = 5;

/// Reply and content calls, authenticated with the channel access token.
pub struct LineMessagingClient {
    client: Client,
    access_token: String,
    /// Base URL of the messaging API (no trailing slash).
    api_base: String,
    /// Base URL of the content API (no trailing slash).
    data_base: String,
}

impl LineMessagingClient {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Result<Self, AdapterError> {
        Ok(Self {
            client: http_client(timeout)?,
            access_token: access_token.into(),
            api_base: LINE_API_BASE.to_string(),
            data_base: LINE_DATA_API_BASE.to_string(),
        })
    }

    /// Point both APIs somewhere else.
    pub fn with_endpoints(mut self, api_base: &str, data_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.data_base = data_base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl MessagingClient for LineMessagingClient {
    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>, CollaboratorError> {
        let fail = |reason: String| CollaboratorError::ContentFetch {
            message_id: message_id.to_string(),
            reason,
        };

        let url = format!("{}/v2/bot/message/{}/content", self.data_base, message_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| fail(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("status {status}")));
        }

        let bytes = response.bytes().await.map_err(|err| fail(err.to_string()))?;
        debug!(message_id, size = bytes.len(), "[rx-runtime] content downloaded");
        Ok(bytes.to_vec())
    }

    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<(), CollaboratorError> {
        let messages = if messages.len() > MAX_REPLY_MESSAGES {
            warn!(
                count = messages.len(),
                "[rx-runtime] reply truncated to {} messages", MAX_REPLY_MESSAGES
            );
            &messages[..MAX_REPLY_MESSAGES]
        } else {
            messages
        };

        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "replyToken": reply_token, "messages": messages }))
            .send()
            .await
            .map_err(|err| CollaboratorError::Reply {
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Reply {
                reason: format!("status {status}: {body}"),
            });
        }
        Ok(())
    }
}
