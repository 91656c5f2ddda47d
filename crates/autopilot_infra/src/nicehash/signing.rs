//! X-Auth request signing.
//!
//! The signed message is the null-byte join of, in order:
//!
//! ```text
//! apiKey, timeMs, nonce, "", orgId, "", method, path, query [, body]
//! ```
//!
//! keyed with HMAC-SHA256 by the API secret. The header value is
//! `"{apiKey}:{hex(hmac)}"`. The query string and body passed here must be
//! the exact bytes that go on the wire.

use hmac::{Hmac, Mac};
use rand::distributions::{Alphanumeric, DistString};
use sha2::Sha256;
use url::form_urlencoded;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

pub const NONCE_LEN: usize = 32;

/// Random 32-character alphanumeric nonce.
pub fn generate_nonce() -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), NONCE_LEN)
}

/// Ordered query parameters.
///
/// Insertion order is kept so that the string signed is the string sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an already-encoded query string (without the leading `?`).
    pub fn parse(raw: &str) -> Self {
        let mut params = Self::new();
        for (k, v) in form_urlencoded::parse(raw.as_bytes()) {
            params.set(k.into_owned(), v.into_owned());
        }
        params
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set `key`, replacing an existing value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Overlay `other` onto `self`; keys in `other` win.
    pub fn merge(&mut self, other: &QueryParams) {
        for (k, v) in &other.0 {
            self.set(k.clone(), v.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `application/x-www-form-urlencoded` serialization in insertion order.
    pub fn encode(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.0 {
            ser.append_pair(k, v);
        }
        ser.finish()
    }
}

/// Request shape covered by the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    /// Path only, starting with `/`, no query.
    pub path: &'a str,
    /// Encoded query string without `?`.
    pub query: Option<&'a str>,
    /// Body exactly as transmitted.
    pub body: Option<&'a str>,
}

fn check_field(name: &str, value: &str) -> Result<(), ApiError> {
    if value.contains('\0') {
        return Err(ApiError::InvalidRequest(format!(
            "{name} must not contain a null byte"
        )));
    }
    Ok(())
}

/// Build the null-delimited message that gets signed.
pub fn canonical_message(
    api_key: &str,
    time_ms: u64,
    nonce: &str,
    org_id: &str,
    request: &SignableRequest<'_>,
) -> Result<Vec<u8>, ApiError> {
    if request.method.is_empty() {
        return Err(ApiError::InvalidRequest("empty method".to_string()));
    }
    if !request.path.starts_with('/') || request.path.contains('?') {
        return Err(ApiError::InvalidRequest(format!(
            "path must be absolute and query-free, got {:?}",
            request.path
        )));
    }
    check_field("api key", api_key)?;
    check_field("nonce", nonce)?;
    check_field("organization id", org_id)?;
    check_field("method", request.method)?;
    check_field("path", request.path)?;
    let query = request.query.unwrap_or("");
    check_field("query", query)?;

    let time = time_ms.to_string();
    let mut fields: Vec<&[u8]> = vec![
        api_key.as_bytes(),
        time.as_bytes(),
        nonce.as_bytes(),
        "".as_bytes(),
        org_id.as_bytes(),
        "".as_bytes(),
        request.method.as_bytes(),
        request.path.as_bytes(),
        query.as_bytes(),
    ];
    if let Some(body) = request.body {
        fields.push(body.as_bytes());
    }
    Ok(fields.join(&0u8))
}

/// Produce the `X-Auth` header value for one request.
pub fn sign(
    api_key: &str,
    api_secret: &str,
    time_ms: u64,
    nonce: &str,
    org_id: &str,
    request: &SignableRequest<'_>,
) -> Result<String, ApiError> {
    let message = canonical_message(api_key, time_ms, nonce, org_id, request)?;
    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
        .map_err(|e| ApiError::InvalidRequest(format!("api secret: {e}")))?;
    mac.update(&message);
    let digest = mac.finalize().into_bytes();
    Ok(format!("{api_key}:{}", hex::encode(digest)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_is_alphanumeric_of_fixed_length() {
        let n = generate_nonce();
        assert_eq!(n.len(), NONCE_LEN);
        assert!(n.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn query_params_keep_insertion_order() {
        let q = QueryParams::new().with("z", "1").with("a", "2").with("z", "3");
        assert_eq!(q.encode(), "z=3&a=2");
    }
}
