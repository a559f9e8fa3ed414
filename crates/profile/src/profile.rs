//! Profile service: business logic for an account's stored files.
//!
//! Goes straight to the store; none of the chunking logic is involved.

use chrono::{DateTime, Utc};
use chunkdrop_protocol::{Address, AuthorFiles, FileName, FileRecord};
use chunkdrop_store::ChunkStore;
use tracing::{debug, info, warn};

use crate::error::ProfileError;

/// Lists and deletes files held by the store.
pub struct ProfileService<'a> {
    store: &'a dyn ChunkStore,
}

impl<'a> ProfileService<'a> {
    pub fn new(store: &'a dyn ChunkStore) -> Self {
        Self { store }
    }

    /// Lists every file uploaded by `author`, in store order.
    ///
    /// Fails with [`ProfileError::LengthMismatch`] if the store returns
    /// parallel sequences of different lengths.
    pub async fn list(&self, author: &Address) -> Result<Vec<FileRecord>, ProfileError> {
        let files = self.store.author_files(author).await?;
        let records = to_records(files)?;
        debug!(author = %author, count = records.len(), "listed files");
        Ok(records)
    }

    /// Removes a file and all of its chunks.
    ///
    /// Returns the store's confirmation flag; `false` means the removal
    /// transaction was rejected.
    pub async fn delete(&self, name: &FileName) -> Result<bool, ProfileError> {
        let confirmed = self.store.remove(name).await?;
        if confirmed {
            info!(file = %name, "file removed");
        } else {
            warn!(file = %name, "remove was not confirmed");
        }
        Ok(confirmed)
    }

    /// Number of chunks the store currently holds for `name`.
    pub async fn chunk_count(&self, name: &FileName) -> Result<u64, ProfileError> {
        Ok(self.store.count_chunks(name).await?)
    }
}

fn to_records(files: AuthorFiles) -> Result<Vec<FileRecord>, ProfileError> {
    let AuthorFiles { times, names, urls } = files;
    if times.len() != names.len() || names.len() != urls.len() {
        return Err(ProfileError::LengthMismatch {
            times: times.len(),
            names: names.len(),
            urls: urls.len(),
        });
    }

    times
        .into_iter()
        .zip(names)
        .zip(urls)
        .map(|((secs, name), url)| {
            Ok(FileRecord {
                uploaded_at: to_instant(secs)?,
                name,
                url,
            })
        })
        .collect()
}

fn to_instant(secs: u64) -> Result<DateTime<Utc>, ProfileError> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .ok_or(ProfileError::InvalidTimestamp(secs))
}
