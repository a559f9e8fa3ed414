//! Account file management: list and delete.
//!
//! This crate implements the **business logic** for inspecting what an
//! account has stored. Like the upload crate it is transport-free and
//! talks to the store through [`ChunkStore`](chunkdrop_store::ChunkStore).
//!
//! # Operations
//!
//! - **List**: all files uploaded by an author, with times and URLs
//! - **Delete**: remove a file and all of its chunks
//! - **Chunk count**: how many chunks the store holds for a name

pub mod error;
pub mod profile;

pub use error::ProfileError;
pub use profile::ProfileService;
