//! Webhook signature verification.
//!
//! The platform signs each delivery with
//! `base64(HMAC-SHA256(channel_secret, body))` in the `X-Line-Signature` header.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Base64 HMAC-SHA256 of `body` under `secret`.
pub fn sign(body: &[u8], secret: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length
        Err(_) => return String::new(),
    };
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Check `signature` against the body. Constant time in the signature bytes.
pub fn verify_signature(body: &[u8], signature: &str, secret: &[u8]) -> bool {
    let expected = sign(body, secret);
    !expected.is_empty() && constant_time_compare(expected.as_bytes(), signature.trim().as_bytes())
}

/// Constant-time comparison that also hides the length difference.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    let max_len = a.len().max(b.len());
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0u8; max_len];
    a_padded[..a.len()].copy_from_slice(a);
    b_padded[..b.len()].copy_from_slice(b);

    let len_eq = a.len().ct_eq(&b.len());
    let content_eq = a_padded.ct_eq(&b_padded);
    (len_eq & content_eq).into()
}
