//! Local side of an upload: read the file, split it, price the chunks.
//!
//! Nothing here talks to the remote store. The upload pipeline drives
//! these pieces one chunk at a time.

mod chunked;
mod fee;
mod reader;

pub use chunked::{Chunk, ChunkLayout, Chunker, Chunks, EffectiveSize};
pub use fee::estimate_cost;
pub use reader::{ContentReader, FileContent};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
