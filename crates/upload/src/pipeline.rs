//! Upload pipeline for a single file.
//!
//! Chunks are processed strictly one after another: chunk `i + 1` is not
//! looked at until chunk `i` is confirmed or found unchanged. The store
//! signs transactions in sequence, so writes are never issued in parallel.

use std::sync::RwLock;

use chunkdrop_protocol::{Fee, FileName};
use chunkdrop_store::ChunkStore;
use chunkdrop_transfer::{Chunk, Chunker, ContentReader, FileContent, estimate_cost};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ChunkFailure, UploadError};
use crate::types::{
    ChunkAction, Gateway, PlannedChunk, UploadEvent, UploadPlan, UploadRequest, UploadState,
    UploadSuccess,
};

enum ChunkResult {
    Skipped,
    Written,
}

/// Uploads files into a chunk store, emitting [`UploadEvent`]s.
pub struct UploadPipeline {
    gateway: Gateway,
    events_tx: mpsc::UnboundedSender<UploadEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<UploadEvent>>,
    cancel: RwLock<CancellationToken>,
    state: RwLock<UploadState>,
}

impl Default for UploadPipeline {
    fn default() -> Self {
        Self::new(Gateway::default())
    }
}

impl UploadPipeline {
    /// Creates a pipeline publishing URLs under `gateway`.
    pub fn new(gateway: Gateway) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            gateway,
            events_tx,
            events_rx: Some(events_rx),
            cancel: RwLock::new(CancellationToken::new()),
            state: RwLock::new(UploadState::Idle),
        }
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// Events are only queued once the receiver has been taken; until
    /// then they are dropped.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns the cancellation token for the current or next upload.
    ///
    /// Cancellation is checked before each chunk starts; a write already
    /// submitted always runs to confirmation. Once an upload has observed
    /// a cancelled token the pipeline switches to a fresh one, so later
    /// uploads run normally and callers fetch a new token for them.
    pub fn cancel_token(&self) -> CancellationToken {
        match self.cancel.read() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Current state of the most recent upload.
    pub fn state(&self) -> UploadState {
        self.state.read().map(|s| *s).unwrap_or_default()
    }

    /// Uploads one file.
    ///
    /// Unchanged chunks are skipped, so re-running an upload of the same
    /// file is cheap and completes whatever a failed run left behind.
    /// Exactly one of `Completed` / `Failed` is emitted per call.
    pub async fn upload(
        &self,
        store: &dyn ChunkStore,
        request: &UploadRequest,
    ) -> Result<UploadSuccess, UploadError> {
        self.set_state(UploadState::Idle);
        let cancel = self.cancel_token();

        let result = self.run(store, request, &cancel).await;
        if cancel.is_cancelled() {
            self.renew_cancel_token();
        }

        match result {
            Ok(success) => {
                self.set_state(UploadState::Succeeded);
                self.emit(UploadEvent::Completed {
                    url: success.path.clone(),
                });
                info!(
                    url = %success.path,
                    written = success.written,
                    skipped = success.skipped,
                    fee = %success.fee_paid,
                    "upload completed"
                );
                Ok(success)
            }
            Err(e) => {
                self.set_state(UploadState::Failed);
                self.emit(UploadEvent::Failed {
                    error: e.to_string(),
                });
                error!(file = %request.file.display(), error = %e, "upload failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        store: &dyn ChunkStore,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadSuccess, UploadError> {
        // 1. Authorize
        let signer = store.signer().await.map_err(|e| {
            if e.is_auth() {
                UploadError::Auth
            } else {
                warn!(error = %e, "signer lookup failed");
                UploadError::UploadFailed
            }
        })?;
        debug!(signer = %signer, "signer available");

        // 2. Read
        self.set_state(UploadState::Reading);
        let content = ContentReader::read(&request.file).await?;
        let name = FileName::join(&request.destination_dir, &content.file_name);

        // 3. Chunk
        self.set_state(UploadState::Chunking);
        let chunks = Chunker::split(&content.data, content.size());
        let layout = *chunks.layout();
        let fee = estimate_cost(layout.effective_size);
        info!(
            file = %name,
            bytes = content.size(),
            chunks = layout.count,
            effective_size = layout.effective_size.as_f64(),
            fee = %fee,
            "upload started"
        );

        // 4. Write
        let mut success = UploadSuccess {
            path: self.gateway.file_url(&request.contract_address, &name),
            chunks: 0,
            written: 0,
            skipped: 0,
            fee_paid: Fee::FREE,
        };

        for chunk in chunks {
            check_cancelled(cancel)?;
            success.chunks += 1;

            match self.process_chunk(store, &name, &chunk, fee).await {
                Ok(ChunkResult::Skipped) => {
                    success.skipped += 1;
                    self.emit(UploadEvent::Skipped { index: chunk.index });
                }
                Ok(ChunkResult::Written) => {
                    success.written += 1;
                    success.fee_paid = success.fee_paid.saturating_add(fee);
                    self.emit(UploadEvent::Progress {
                        percent: chunk.index,
                    });
                }
                Err(failure) => {
                    warn!(file = %name, error = %failure, "chunk upload failed, aborting");
                    return Err(UploadError::UploadFailed);
                }
            }
        }

        Ok(success)
    }

    async fn process_chunk(
        &self,
        store: &dyn ChunkStore,
        name: &FileName,
        chunk: &Chunk<'_>,
        fee: Fee,
    ) -> Result<ChunkResult, ChunkFailure> {
        let index = chunk.index;
        self.set_state(UploadState::Checking(index));

        let remote = store
            .chunk_hash(name, index)
            .await
            .map_err(|source| ChunkFailure::Network { index, source })?;
        if remote == chunk.digest {
            self.set_state(UploadState::Skipping(index));
            debug!(file = %name, chunk = index, "data is not changed");
            return Ok(ChunkResult::Skipped);
        }

        self.set_state(UploadState::Submitting(index));
        let confirmed = store
            .write_chunk(name, index, chunk.data, fee)
            .await
            .map_err(|source| ChunkFailure::Network { index, source })?;
        if !confirmed {
            return Err(ChunkFailure::Rejected { index });
        }

        debug!(file = %name, chunk = index, bytes = chunk.data.len(), "chunk confirmed");
        Ok(ChunkResult::Written)
    }

    /// Computes what [`upload`](Self::upload) would do, without writing.
    ///
    /// Emits no events and leaves the pipeline state untouched.
    pub async fn plan(
        &self,
        store: &dyn ChunkStore,
        request: &UploadRequest,
    ) -> Result<UploadPlan, UploadError> {
        let content = ContentReader::read(&request.file).await?;
        self.plan_content(store, request, &content).await
    }

    async fn plan_content(
        &self,
        store: &dyn ChunkStore,
        request: &UploadRequest,
        content: &FileContent,
    ) -> Result<UploadPlan, UploadError> {
        let name = FileName::join(&request.destination_dir, &content.file_name);
        let chunks = Chunker::split(&content.data, content.size());
        let effective_size = chunks.effective_size();
        let fee = estimate_cost(effective_size);

        let mut planned = Vec::new();
        let mut total_fee = Fee::FREE;
        for chunk in chunks {
            let remote = store.chunk_hash(&name, chunk.index).await?;
            let action = if remote == chunk.digest {
                ChunkAction::Skip
            } else {
                total_fee = total_fee.saturating_add(fee);
                ChunkAction::Write { fee }
            };
            planned.push(PlannedChunk {
                index: chunk.index,
                len: chunk.data.len(),
                digest: chunk.digest,
                action,
            });
        }

        Ok(UploadPlan {
            url: self.gateway.file_url(&request.contract_address, &name),
            name,
            effective_size: effective_size.as_f64(),
            chunks: planned,
            total_fee,
        })
    }

    fn renew_cancel_token(&self) {
        if let Ok(mut token) = self.cancel.write()
            && token.is_cancelled()
        {
            *token = CancellationToken::new();
        }
    }

    fn set_state(&self, state: UploadState) {
        if let Ok(mut s) = self.state.write() {
            *s = state;
        }
    }

    fn emit(&self, event: UploadEvent) {
        // Nobody listens until the receiver is taken.
        if self.events_rx.is_none() {
            let _ = self.events_tx.send(event);
        }
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), UploadError> {
    if cancel.is_cancelled() {
        Err(UploadError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkdrop_protocol::{Address, AuthorFiles, Digest, keccak256};
    use chunkdrop_store::{StoreError, StoreFuture};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    const CONTRACT: &str = "0xb9fcf1e7d1d1c1a1e1e1e1e1e1e1e1e1e1e1e1e1";

    /// In-memory chunk store that records calls.
    #[derive(Default)]
    struct MockStore {
        no_signer: bool,
        reject_at: Mutex<Option<u64>>,
        fail_write_at: Option<u64>,
        fail_hash_at: Option<u64>,
        remote: Mutex<HashMap<(String, u64), Digest>>,
        hash_calls: Mutex<Vec<u64>>,
        writes: Mutex<Vec<(String, u64, usize, Fee)>>,
    }

    impl MockStore {
        fn written_indices(&self) -> Vec<u64> {
            self.writes.lock().unwrap().iter().map(|w| w.1).collect()
        }

        fn seed(&self, name: &str, index: u64, data: &[u8]) {
            self.remote
                .lock()
                .unwrap()
                .insert((name.to_string(), index), keccak256(data));
        }
    }

    impl ChunkStore for MockStore {
        fn signer(&self) -> StoreFuture<'_, Address> {
            Box::pin(async move {
                if self.no_signer {
                    Err(StoreError::NoSigner)
                } else {
                    Ok(Address::new([0x22; 20]))
                }
            })
        }

        fn chunk_hash<'a>(&'a self, name: &'a FileName, index: u64) -> StoreFuture<'a, Digest> {
            Box::pin(async move {
                self.hash_calls.lock().unwrap().push(index);
                if self.fail_hash_at == Some(index) {
                    return Err(StoreError::Api {
                        status: 503,
                        body: "unavailable".into(),
                    });
                }
                let remote = self.remote.lock().unwrap();
                Ok(remote
                    .get(&(name.as_str().to_string(), index))
                    .copied()
                    .unwrap_or(Digest::ZERO))
            })
        }

        fn write_chunk<'a>(
            &'a self,
            name: &'a FileName,
            index: u64,
            data: &'a [u8],
            fee: Fee,
        ) -> StoreFuture<'a, bool> {
            Box::pin(async move {
                self.writes
                    .lock()
                    .unwrap()
                    .push((name.as_str().to_string(), index, data.len(), fee));
                if self.fail_write_at == Some(index) {
                    return Err(StoreError::Decode("connection reset".into()));
                }
                if *self.reject_at.lock().unwrap() == Some(index) {
                    return Ok(false);
                }
                self.remote
                    .lock()
                    .unwrap()
                    .insert((name.as_str().to_string(), index), keccak256(data));
                Ok(true)
            })
        }

        fn remove<'a>(&'a self, _name: &'a FileName) -> StoreFuture<'a, bool> {
            Box::pin(async move { Ok(true) })
        }

        fn count_chunks<'a>(&'a self, _name: &'a FileName) -> StoreFuture<'a, u64> {
            Box::pin(async move { Ok(0) })
        }

        fn author_files<'a>(&'a self, _author: &'a Address) -> StoreFuture<'a, AuthorFiles> {
            Box::pin(async move { Ok(AuthorFiles::default()) })
        }
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    fn request(file: PathBuf) -> UploadRequest {
        UploadRequest {
            contract_address: CONTRACT.into(),
            destination_dir: "docs/".into(),
            file,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<UploadEvent>) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[tokio::test]
    async fn small_file_single_free_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", b"hello");

        let store = MockStore::default();
        let mut pipeline = UploadPipeline::default();
        let mut events = pipeline.take_events().unwrap();

        let result = pipeline.upload(&store, &request(path)).await.unwrap();
        let url = format!("https://galileo.web3q.io/{CONTRACT}:3334/docs/a.txt");
        assert_eq!(result.path, url);
        assert_eq!(result.written, 1);
        assert_eq!(result.fee_paid, Fee::FREE);

        let writes = store.writes.lock().unwrap().clone();
        assert_eq!(writes, vec![("docs/a.txt".to_string(), 0, 5, Fee::FREE)]);

        assert_eq!(
            drain(&mut events),
            vec![
                UploadEvent::Progress { percent: 0 },
                UploadEvent::Completed { url },
            ]
        );
        assert_eq!(pipeline.state(), UploadState::Succeeded);
    }

    #[tokio::test]
    async fn large_file_pays_nominal_fee_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "big.bin", &sample(1_000_000));

        let store = MockStore::default();
        let pipeline = UploadPipeline::default();
        let result = pipeline.upload(&store, &request(path)).await.unwrap();

        assert_eq!(result.chunks, 3);
        assert_eq!(result.written, 3);
        assert_eq!(result.fee_paid, Fee::from_units(39));

        let writes = store.writes.lock().unwrap().clone();
        let lens: Vec<usize> = writes.iter().map(|w| w.2).collect();
        assert_eq!(lens, vec![333_334, 333_334, 333_332]);
        assert!(writes.iter().all(|w| w.3 == Fee::from_units(13)));
        assert_eq!(store.written_indices(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn second_upload_of_unchanged_file_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "big.bin", &sample(1_000_000));

        let store = MockStore::default();
        let mut pipeline = UploadPipeline::default();
        let mut events = pipeline.take_events().unwrap();

        let first = pipeline.upload(&store, &request(path.clone())).await.unwrap();
        drain(&mut events);
        let second = pipeline.upload(&store, &request(path)).await.unwrap();

        assert_eq!(store.writes.lock().unwrap().len(), 3);
        assert_eq!(second.written, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(second.fee_paid, Fee::FREE);
        assert_eq!(first.path, second.path);

        let events = drain(&mut events);
        assert!(!events.iter().any(|e| matches!(e, UploadEvent::Progress { .. })));
        assert_eq!(
            events.last(),
            Some(&UploadEvent::Completed { url: second.path })
        );
    }

    #[tokio::test]
    async fn rejected_write_aborts_remaining_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "big.bin", &sample(1_000_000));

        let store = MockStore {
            reject_at: Mutex::new(Some(1)),
            ..MockStore::default()
        };
        let mut pipeline = UploadPipeline::default();
        let mut events = pipeline.take_events().unwrap();

        let err = pipeline.upload(&store, &request(path)).await.unwrap_err();
        assert!(matches!(err, UploadError::UploadFailed));
        assert_eq!(err.to_string(), "upload request failed!");

        assert_eq!(store.written_indices(), vec![0, 1]);
        assert_eq!(*store.hash_calls.lock().unwrap(), vec![0, 1]);
        assert_eq!(
            drain(&mut events),
            vec![
                UploadEvent::Progress { percent: 0 },
                UploadEvent::Failed {
                    error: "upload request failed!".into()
                },
            ]
        );
        assert_eq!(pipeline.state(), UploadState::Failed);
    }

    #[tokio::test]
    async fn transport_failure_aborts_like_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "big.bin", &sample(1_000_000));

        let store = MockStore {
            fail_write_at: Some(0),
            ..MockStore::default()
        };
        let pipeline = UploadPipeline::default();

        let err = pipeline.upload(&store, &request(path)).await.unwrap_err();
        assert!(matches!(err, UploadError::UploadFailed));
        assert_eq!(store.written_indices(), vec![0]);
        assert_eq!(*store.hash_calls.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn rerun_after_failure_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "big.bin", &sample(1_000_000));

        let store = MockStore {
            reject_at: Mutex::new(Some(1)),
            ..MockStore::default()
        };
        let pipeline = UploadPipeline::default();
        assert!(pipeline.upload(&store, &request(path.clone())).await.is_err());

        *store.reject_at.lock().unwrap() = None;
        store.writes.lock().unwrap().clear();

        let result = pipeline.upload(&store, &request(path)).await.unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(result.written, 2);
        assert_eq!(store.written_indices(), vec![1, 2]);
    }

    #[tokio::test]
    async fn progress_reports_chunk_index() {
        let dir = tempfile::tempdir().unwrap();
        let data = sample(1_000_000);
        let path = write_file(dir.path(), "big.bin", &data);

        let store = MockStore::default();
        store.seed("docs/big.bin", 0, &data[..333_334]);

        let mut pipeline = UploadPipeline::default();
        let mut events = pipeline.take_events().unwrap();
        pipeline.upload(&store, &request(path)).await.unwrap();

        let events = drain(&mut events);
        assert_eq!(events[0], UploadEvent::Skipped { index: 0 });
        assert_eq!(events[1], UploadEvent::Progress { percent: 1 });
        assert_eq!(events[2], UploadEvent::Progress { percent: 2 });
        assert!(matches!(events[3], UploadEvent::Completed { .. }));
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn missing_signer_fails_before_any_work() {
        let store = MockStore {
            no_signer: true,
            ..MockStore::default()
        };
        let mut pipeline = UploadPipeline::default();
        let mut events = pipeline.take_events().unwrap();

        // The file does not exist: the signer check must come first.
        let req = request(PathBuf::from("/nonexistent/file.bin"));
        let err = pipeline.upload(&store, &req).await.unwrap_err();
        assert!(matches!(err, UploadError::Auth));
        assert!(store.hash_calls.lock().unwrap().is_empty());
        assert_eq!(
            drain(&mut events),
            vec![UploadEvent::Failed {
                error: "no authorized signer available".into()
            }]
        );
    }

    #[tokio::test]
    async fn unreadable_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::default();
        let pipeline = UploadPipeline::default();

        let err = pipeline
            .upload(&store, &request(dir.path().join("missing.bin")))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Read(_)));
        assert!(store.hash_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_before_first_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", b"hello");

        let store = MockStore::default();
        let pipeline = UploadPipeline::default();
        pipeline.cancel_token().cancel();

        let err = pipeline.upload(&store, &request(path)).await.unwrap_err();
        assert!(matches!(err, UploadError::Cancelled));
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancellation_applies_to_one_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", b"hello");

        let store = MockStore::default();
        let pipeline = UploadPipeline::default();
        let token = pipeline.cancel_token();
        token.cancel();

        let err = pipeline.upload(&store, &request(path.clone())).await.unwrap_err();
        assert!(matches!(err, UploadError::Cancelled));

        assert!(!pipeline.cancel_token().is_cancelled());
        let result = pipeline.upload(&store, &request(path)).await.unwrap();
        assert_eq!(result.written, 1);
        assert_eq!(store.written_indices(), vec![0]);
    }

    #[tokio::test]
    async fn hash_lookup_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "big.bin", &sample(1_000_000));

        let store = MockStore {
            fail_hash_at: Some(1),
            ..MockStore::default()
        };
        let mut pipeline = UploadPipeline::default();
        let mut events = pipeline.take_events().unwrap();

        let err = pipeline.upload(&store, &request(path)).await.unwrap_err();
        assert!(matches!(err, UploadError::UploadFailed));
        assert_eq!(store.written_indices(), vec![0]);
        assert_eq!(*store.hash_calls.lock().unwrap(), vec![0, 1]);
        assert_eq!(
            drain(&mut events),
            vec![
                UploadEvent::Progress { percent: 0 },
                UploadEvent::Failed {
                    error: "upload request failed!".into()
                },
            ]
        );
        assert_eq!(pipeline.state(), UploadState::Failed);
    }

    #[tokio::test]
    async fn events_not_buffered_before_receiver_taken() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", b"hello");

        let store = MockStore::default();
        let mut pipeline = UploadPipeline::default();
        for _ in 0..20 {
            pipeline.upload(&store, &request(path.clone())).await.unwrap();
        }

        let mut events = pipeline.take_events().unwrap();
        assert!(drain(&mut events).is_empty());

        pipeline.upload(&store, &request(path)).await.unwrap();
        let events = drain(&mut events);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], UploadEvent::Skipped { index: 0 });
        assert!(matches!(events[1], UploadEvent::Completed { .. }));
    }

    #[tokio::test]
    async fn plan_reports_changed_chunks_only() {
        let dir = tempfile::tempdir().unwrap();
        let data = sample(1_000_000);
        let path = write_file(dir.path(), "big.bin", &data);

        let store = MockStore::default();
        store.seed("docs/big.bin", 2, &data[666_668..]);

        let mut pipeline = UploadPipeline::default();
        let mut events = pipeline.take_events().unwrap();
        let plan = pipeline.plan(&store, &request(path)).await.unwrap();

        assert_eq!(plan.name.as_str(), "docs/big.bin");
        assert_eq!(plan.chunks.len(), 3);
        assert_eq!(plan.writes(), 2);
        assert_eq!(plan.total_fee, Fee::from_units(26));
        assert_eq!(plan.chunks[2].action, ChunkAction::Skip);
        assert_eq!(
            plan.chunks[0].action,
            ChunkAction::Write {
                fee: Fee::from_units(13)
            }
        );

        assert!(store.writes.lock().unwrap().is_empty());
        assert!(drain(&mut events).is_empty());
        assert_eq!(pipeline.state(), UploadState::Idle);
    }

    #[tokio::test]
    async fn take_events_once() {
        let mut pipeline = UploadPipeline::default();
        assert!(pipeline.take_events().is_some());
        assert!(pipeline.take_events().is_none());
    }
}
