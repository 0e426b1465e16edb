//! Gateway error types.
//!
//! Every variant rejects the whole delivery with `400 Bad Request` before any
//! event reaches the intake service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Webhook rejection reasons.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The `X-Line-Signature` header is absent or not valid UTF-8.
    #[error("missing signature header")]
    MissingSignature,

    /// The body does not match the signature.
    #[error("invalid signature")]
    InvalidSignature,

    /// Signed body is not a webhook payload.
    #[error("malformed payload: {0}")]
    BadPayload(String),
}

impl GatewayError {
    /// Label for the request outcome metric.
    pub fn label(&self) -> &'static str {
        match self {
            GatewayError::MissingSignature => "missing_signature",
            GatewayError::InvalidSignature => "invalid_signature",
            GatewayError::BadPayload(_) => "bad_payload",
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
