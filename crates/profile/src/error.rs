use chunkdrop_store::StoreError;

/// Errors produced by profile operations.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("listing sequences differ in length: {times} times, {names} names, {urls} urls")]
    LengthMismatch {
        times: usize,
        names: usize,
        urls: usize,
    },

    #[error("invalid upload timestamp: {0}")]
    InvalidTimestamp(u64),
}
