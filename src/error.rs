use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Schema generation governing an accessor, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchemaVersion {
    V2,
    V3,
}

impl SchemaVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaVersion::V2 => "v2.0",
            SchemaVersion::V3 => "v3",
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for token decoding and field access.
///
/// Soft field misses never show up here: they are absorbed to `None` before
/// reaching the caller. Everything below carries enough context (schema
/// generation, field path) to diagnose a malformed token.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Neither schema's root key was found in the payload. Fatal: the caller
    /// handed us something that is not an identity-token response.
    #[error("unrecognized auth payload: no 'token' or 'access' root key")]
    UnrecognizedPayload,

    /// A hard field accessor found its key path absent.
    #[error("{schema} token is missing required field '{field}'")]
    MissingField {
        schema: SchemaVersion,
        field: String,
    },

    /// A node along a key path has an unexpected shape (e.g. a string where
    /// an object was expected). Propagates through soft accessors too.
    #[error("{schema} token field '{field}' has an unexpected shape")]
    MalformedField {
        schema: SchemaVersion,
        field: String,
    },

    /// A hard timestamp field was present but not parseable.
    #[error("{schema} token field '{field}' holds unparseable timestamp '{value}'")]
    InvalidTimestamp {
        schema: SchemaVersion,
        field: String,
        value: String,
    },

    /// The transport response body could not be decoded as JSON.
    #[error("transport body is not valid JSON: {0}")]
    BodyDecode(#[from] serde_json::Error),
}
