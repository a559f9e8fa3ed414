//! Remote chunk store access.
//!
//! [`ChunkStore`] is the capability surface the upload pipeline and the
//! profile service need from the store. [`RpcChunkStore`] implements it
//! over JSON-RPC; tests substitute in-process mocks.

pub mod error;
pub mod rpc;

use std::future::Future;
use std::pin::Pin;

use chunkdrop_protocol::{Address, AuthorFiles, Digest, Fee, FileName};

pub use error::StoreError;
pub use rpc::{RpcChunkStore, RpcConfig};

/// Boxed future returned by every [`ChunkStore`] call.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Abstract connection to the remote chunk store.
///
/// Mutating calls submit a transaction and resolve only once the store
/// has confirmed or rejected it. A rejection resolves to `Ok(false)`;
/// `Err` is reserved for calls that could not be carried out.
pub trait ChunkStore: Send + Sync {
    /// Returns the account that signs writes, or [`StoreError::NoSigner`].
    fn signer(&self) -> StoreFuture<'_, Address>;

    /// Digest the store holds for chunk `index` of `name` ([`Digest::ZERO`] if none).
    fn chunk_hash<'a>(&'a self, name: &'a FileName, index: u64) -> StoreFuture<'a, Digest>;

    /// Writes one chunk, paying `fee`, and waits for confirmation.
    fn write_chunk<'a>(
        &'a self,
        name: &'a FileName,
        index: u64,
        data: &'a [u8],
        fee: Fee,
    ) -> StoreFuture<'a, bool>;

    /// Removes a file and waits for confirmation.
    fn remove<'a>(&'a self, name: &'a FileName) -> StoreFuture<'a, bool>;

    /// Number of chunks the store holds for `name`.
    fn count_chunks<'a>(&'a self, name: &'a FileName) -> StoreFuture<'a, u64>;

    /// Files uploaded by `author`, as three parallel sequences.
    fn author_files<'a>(&'a self, author: &'a Address) -> StoreFuture<'a, AuthorFiles>;
}
