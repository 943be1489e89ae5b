use std::time::Duration;
use thiserror::Error;
use tmverify_core::VerificationError;

/// A response that arrived but could not be turned into core types.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{field}: invalid hex {value:?}: {reason}")]
    Hex {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field}: invalid base64: {reason}")]
    Base64 { field: &'static str, reason: String },

    #[error("{field}: expected an integer, got {value:?}")]
    Integer { field: &'static str, value: String },

    #[error("{field}: invalid RFC 3339 time {value:?}: {reason}")]
    Time {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("unsupported public key type {0:?}")]
    UnsupportedKeyType(String),

    #[error("validator {index}: {reason}")]
    InvalidValidator { index: usize, reason: String },

    #[error("commit signature {index}: {reason}")]
    InvalidCommitSig { index: usize, reason: String },

    #[error("validator set: {0}")]
    ValidatorSet(#[from] VerificationError),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from fetching chain data. None of these are verification failures.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP transport error calling {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} calling {method}")]
    HttpStatus { method: String, status: u16 },

    #[error("JSON-RPC error {code} calling {method}: {message} {data}")]
    JsonRpc {
        method: String,
        code: i64,
        message: String,
        data: String,
    },

    #[error("{method} returned neither a result nor an error")]
    EmptyResponse { method: String },

    #[error("Malformed {method} response: {source}")]
    Decode {
        method: String,
        #[source]
        source: DecodeError,
    },

    #[error("No block at height {height} yet")]
    NotFound { height: u64 },

    #[error("Timed out after {waited:?} waiting for block {height}")]
    Timeout { height: u64, waited: Duration },

    #[error("Unexpected {kind} event on a new-block subscription")]
    UnexpectedEvent { kind: String },

    #[error("Event subscription ended before block {height} arrived")]
    SubscriptionClosed { height: u64 },

    #[error("Invalid RPC client configuration: {0}")]
    Config(String),
}

impl RpcError {
    pub(crate) fn decode(method: &str, source: DecodeError) -> Self {
        RpcError::Decode {
            method: method.to_string(),
            source,
        }
    }
}
