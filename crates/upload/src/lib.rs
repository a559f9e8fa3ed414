//! Upload flow: read, chunk, skip unchanged, pay, write.
//!
//! This crate implements the **business logic** for putting one local
//! file into the remote chunk store. It has no transport of its own:
//! callers hand it a [`ChunkStore`](chunkdrop_store::ChunkStore).
//!
//! # Pipeline
//!
//! 1. **Authorize**: make sure a signer is available
//! 2. **Read**: load the whole file into memory
//! 3. **Chunk**: split by size, price the nominal chunk
//! 4. **Write**: per chunk, compare digests and write only changed chunks,
//!    strictly in order, stopping at the first failure
//! 5. **Complete**: report the public URL

pub mod error;
pub mod pipeline;
pub mod types;

// Re-export primary types for convenience.
pub use error::UploadError;
pub use pipeline::UploadPipeline;
pub use types::{
    ChunkAction, Gateway, PlannedChunk, UploadEvent, UploadPlan, UploadRequest, UploadState,
    UploadSuccess,
};
