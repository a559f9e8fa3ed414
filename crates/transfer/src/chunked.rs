use chunkdrop_protocol::{Digest, keccak256};
use chunkdrop_protocol::constants::CHUNK_THRESHOLD;

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Nominal per-chunk size used for pricing: `total_size / chunk_count`.
///
/// This is an estimate, not an exact accounting. When the file length
/// does not divide evenly, actual chunk lengths differ from it (the last
/// chunk is shorter), but the store's fee schedule is keyed to this
/// nominal value. Kept as an exact ratio so pricing never depends on
/// float rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveSize {
    total: u64,
    count: u64,
}

impl EffectiveSize {
    /// Effective size of a single write of `bytes`.
    pub fn from_bytes(bytes: u64) -> Self {
        Self {
            total: bytes,
            count: 1,
        }
    }

    pub(crate) fn new(total: u64, count: u64) -> Self {
        Self {
            total,
            count: count.max(1),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Approximate size in bytes, for display.
    pub fn as_f64(&self) -> f64 {
        self.total as f64 / self.count as f64
    }
}

/// How a file of a given size is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    /// Nominal number of chunks: `ceil(total / threshold)`, at least 1.
    pub count: u64,
    /// Byte length of every chunk except possibly the last.
    pub chunk_len: usize,
    pub effective_size: EffectiveSize,
}

impl ChunkLayout {
    /// Computes the layout for `len` bytes of a file whose declared size is `total_size`.
    pub fn for_size(len: usize, total_size: u64) -> Self {
        if total_size <= CHUNK_THRESHOLD {
            return Self {
                count: 1,
                chunk_len: len,
                effective_size: EffectiveSize::new(total_size, 1),
            };
        }

        let count = total_size.div_ceil(CHUNK_THRESHOLD);
        let chunk_len = len.div_ceil(count as usize);
        Self {
            count,
            chunk_len,
            effective_size: EffectiveSize::new(total_size, count),
        }
    }
}

// ---------------------------------------------------------------------------
// Chunks
// ---------------------------------------------------------------------------

/// One contiguous piece of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Position in file order, starting at 0.
    pub index: u64,
    pub data: &'a [u8],
    /// Content digest as the store computes it.
    pub digest: Digest,
}

/// Splits file bytes into the chunk sequence the store expects.
pub struct Chunker;

impl Chunker {
    /// Splits `data` into ordered chunks.
    ///
    /// A file of at most 475 KiB yields exactly one chunk holding all of
    /// it, including the empty file. Larger files yield
    /// `ceil(total_size / 475 KiB)` consecutive pieces of
    /// `ceil(len / count)` bytes; the last piece may be shorter.
    pub fn split(data: &[u8], total_size: u64) -> Chunks<'_> {
        Chunks {
            data,
            layout: ChunkLayout::for_size(data.len(), total_size),
            offset: 0,
            next_index: 0,
        }
    }
}

/// Lazy iterator over a file's chunks; each digest is computed on demand.
pub struct Chunks<'a> {
    data: &'a [u8],
    layout: ChunkLayout,
    offset: usize,
    next_index: u64,
}

impl<'a> Chunks<'a> {
    pub fn layout(&self) -> &ChunkLayout {
        &self.layout
    }

    pub fn effective_size(&self) -> EffectiveSize {
        self.layout.effective_size
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        // The first chunk is always produced, even for an empty file.
        if self.next_index > 0 && self.offset >= self.data.len() {
            return None;
        }

        let end = std::cmp::min(self.offset + self.layout.chunk_len, self.data.len());
        let data = &self.data[self.offset..end];
        let chunk = Chunk {
            index: self.next_index,
            data,
            digest: keccak256(data),
        };

        self.offset = end;
        self.next_index += 1;
        Some(chunk)
    }
}
