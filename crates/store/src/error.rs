//! Store error types.

use std::time::Duration;

use chunkdrop_protocol::ProtocolError;

/// Errors produced by chunk store calls.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no authorized signer available")]
    NoSigner,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("no confirmation after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// True when the call failed because nothing can sign for it.
    pub fn is_auth(&self) -> bool {
        matches!(self, StoreError::NoSigner)
    }
}

impl From<ProtocolError> for StoreError {
    fn from(e: ProtocolError) -> Self {
        StoreError::Decode(e.to_string())
    }
}
