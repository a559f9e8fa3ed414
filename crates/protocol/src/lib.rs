//! Wire types shared by every chunkdrop crate.
//!
//! Holds the store's naming and digest conventions (keccak-256 digests
//! and addresses come from `alloy-primitives`), the size and fee
//! constants the remote fee schedule is keyed to, and the contract ABI
//! codec used to talk to the file store.

pub mod abi;
pub mod constants;
pub mod types;

// Re-export primary types for convenience.
pub use alloy_primitives::keccak256;
pub use types::{Address, AuthorFiles, Digest, Fee, FileName, FileRecord, ProtocolError};
