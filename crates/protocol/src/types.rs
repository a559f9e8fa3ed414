use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::BASE_UNITS_PER_FEE_UNIT;

/// Errors produced while decoding store responses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("ABI decode error: {0}")]
    Abi(String),
}

/// A 20-byte account or contract address.
///
/// Parses with or without the `0x` prefix and displays EIP-55 checksummed.
pub use alloy_primitives::Address;

/// A 256-bit chunk digest, rendered as `0x`-prefixed lowercase hex.
///
/// [`Digest::ZERO`] is what the store reports for a chunk it has never seen.
pub type Digest = alloy_primitives::B256;

// ---------------------------------------------------------------------------
// FileName
// ---------------------------------------------------------------------------

/// Name of a file inside the store: destination directory + file name.
///
/// The store keys files by the UTF-8 bytes of this string. No separator
/// is inserted between directory and file name, and nothing is escaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileName(String);

impl FileName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Builds the destination name by plain concatenation.
    pub fn join(dir: &str, file_name: &str) -> Self {
        Self(format!("{dir}{file_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Fee
// ---------------------------------------------------------------------------

/// Payment attached to a chunk write, in whole fee units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fee(u64);

impl Fee {
    pub const FREE: Fee = Fee(0);

    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    pub fn units(&self) -> u64 {
        self.0
    }

    pub fn is_free(&self) -> bool {
        self.0 == 0
    }

    /// Value in the currency's smallest divisible unit.
    pub fn to_base_units(&self) -> u128 {
        u128::from(self.0) * BASE_UNITS_PER_FEE_UNIT
    }

    pub fn saturating_add(self, other: Fee) -> Fee {
        Fee(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Raw listing returned by the store: three parallel sequences.
///
/// Index `i` across all three vectors describes the same file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorFiles {
    /// Upload times in seconds since the Unix epoch.
    pub times: Vec<u64>,
    pub names: Vec<String>,
    pub urls: Vec<String>,
}

/// A previously uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub uploaded_at: DateTime<Utc>,
    pub name: String,
    pub url: String,
}
