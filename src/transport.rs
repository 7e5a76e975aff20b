use http::HeaderMap;
use serde_json::Value;

use crate::error::AccessError;

/// Header carrying the bearer token on newer-generation auth responses.
pub static SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// The already-received transport response an accessor can be built from.
///
/// This core performs no I/O: the caller hands over the response parts it
/// got from its own HTTP client, and we only decode the body and look up
/// headers.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    headers: HeaderMap,
    body: String,
}

impl TransportResponse {
    pub fn new(headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    /// Decode the response body as JSON.
    pub fn json(&self) -> Result<Value, AccessError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Header lookup, absent or non-UTF8 values yield `None`.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }
}
