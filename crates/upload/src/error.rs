//! Upload error types.

use chunkdrop_store::StoreError;
use chunkdrop_transfer::TransferError;

/// Errors produced by an upload.
///
/// Chunk-level failures (transport errors, rejected writes) collapse
/// into [`UploadError::UploadFailed`]; details are only logged.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no authorized signer available")]
    Auth,

    #[error(transparent)]
    Read(#[from] TransferError),

    #[error("upload request failed!")]
    UploadFailed,

    /// Remote failure while planning; uploads report `UploadFailed` instead.
    #[error("remote store error: {0}")]
    Remote(#[from] StoreError),

    #[error("cancelled")]
    Cancelled,
}

/// Why a single chunk could not be stored.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ChunkFailure {
    #[error("write of chunk {index} was rejected")]
    Rejected { index: u64 },

    #[error("chunk {index}: {source}")]
    Network {
        index: u64,
        #[source]
        source: StoreError,
    },
}
