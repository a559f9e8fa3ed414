use std::path::{Path, PathBuf};

use tracing::debug;

use crate::TransferError;

/// A local file fully loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub path: PathBuf,
    /// Final path component, used to build the destination name.
    pub file_name: String,
    pub data: Vec<u8>,
}

impl FileContent {
    /// Declared size of the file in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Reads local files for upload.
///
/// Files are materialized completely before chunking starts, since the
/// chunk count depends on the total size.
pub struct ContentReader;

impl ContentReader {
    /// Reads the whole file at `path`.
    pub async fn read(path: &Path) -> Result<FileContent, TransferError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransferError::InvalidPath(path.display().to_string()))?
            .to_string();

        let data = tokio::fs::read(path)
            .await
            .map_err(|source| TransferError::Read {
                path: path.display().to_string(),
                source,
            })?;

        debug!(path = %path.display(), bytes = data.len(), "file loaded");

        Ok(FileContent {
            path: path.to_path_buf(),
            file_name,
            data,
        })
    }
}
