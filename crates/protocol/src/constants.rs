//! Size thresholds and fee schedule of the remote store.
//!
//! These values must match the store exactly: the fee charged for a
//! write is checked on-chain against the nominal chunk size.

/// Files above this size (475 KiB) are split into several chunks.
pub const CHUNK_THRESHOLD: u64 = 475 * 1024;

/// Bytes of per-write overhead added before the fee is computed.
pub const FEE_OVERHEAD: u64 = 326;

/// Bytes covered by one fee unit (24 KiB).
pub const FEE_UNIT_BYTES: u64 = 24 * 1024;

/// Writes with a nominal size up to this ceiling are free.
pub const FREE_WRITE_CEILING: u64 = FEE_UNIT_BYTES - FEE_OVERHEAD;

/// Smallest divisible units per fee unit (ether to wei).
pub const BASE_UNITS_PER_FEE_UNIT: u128 = 1_000_000_000_000_000_000;

/// Public gateway host serving uploaded files.
pub const DEFAULT_STORE_HOST: &str = "galileo.web3q.io";

/// Port segment of the public gateway URL.
pub const DEFAULT_STORE_PORT: u16 = 3334;
