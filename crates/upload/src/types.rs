//! Data types for the upload flow.

use std::path::PathBuf;

use chunkdrop_protocol::constants::{DEFAULT_STORE_HOST, DEFAULT_STORE_PORT};
use chunkdrop_protocol::{Digest, Fee, FileName};
use serde::Serialize;

/// One upload call: which file goes where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Contract address, exactly as it should appear in the public URL.
    pub contract_address: String,
    /// Destination directory; prepended verbatim to the file name.
    pub destination_dir: String,
    pub file: PathBuf,
}

/// Public HTTP gateway serving stored files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    pub host: String,
    pub port: u16,
}

impl Default for Gateway {
    fn default() -> Self {
        Self {
            host: DEFAULT_STORE_HOST.into(),
            port: DEFAULT_STORE_PORT,
        }
    }
}

impl Gateway {
    /// `https://<host>/<contract>:<port>/<name>`, concatenated byte for byte.
    pub fn file_url(&self, contract_address: &str, name: &FileName) -> String {
        format!(
            "https://{}/{}:{}/{}",
            self.host, contract_address, self.port, name
        )
    }
}

/// Where an upload currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadState {
    #[default]
    Idle,
    Reading,
    Chunking,
    /// Comparing chunk `i` against the remote digest.
    Checking(u64),
    Skipping(u64),
    Submitting(u64),
    Succeeded,
    Failed,
}

/// Event emitted during an upload.
///
/// Per upload call: one `Progress` per chunk actually written, one
/// `Skipped` per unchanged chunk, then exactly one of `Completed` or
/// `Failed`. Nothing follows the terminal event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UploadEvent {
    /// Chunk written. `percent` carries the chunk index, not a percentage.
    Progress { percent: u64 },
    Skipped { index: u64 },
    Completed { url: String },
    Failed { error: String },
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSuccess {
    /// Public URL of the stored file.
    pub path: String,
    pub chunks: u64,
    pub written: u64,
    pub skipped: u64,
    pub fee_paid: Fee,
}

/// What an upload would do with one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ChunkAction {
    Write { fee: Fee },
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedChunk {
    pub index: u64,
    pub len: usize,
    pub digest: Digest,
    pub action: ChunkAction,
}

/// Dry-run result: the writes an upload would perform right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPlan {
    pub name: FileName,
    pub url: String,
    /// Nominal per-chunk size the fee is based on (approximate).
    pub effective_size: f64,
    pub chunks: Vec<PlannedChunk>,
    pub total_fee: Fee,
}

impl UploadPlan {
    /// Number of chunks that would be written.
    pub fn writes(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| matches!(c.action, ChunkAction::Write { .. }))
            .count()
    }
}
