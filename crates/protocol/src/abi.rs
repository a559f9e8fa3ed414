//! Calldata and return-value codec for the file store contract.
//!
//! Names travel as `bytes` (the UTF-8 of the destination path). The
//! listing's `names` and `urls` are declared `bytes[]`; `string` shares
//! that layout, so contracts returning `string[]` decode the same way.

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{SolCall, sol};

use crate::types::{Address, AuthorFiles, Digest, FileName, ProtocolError};

sol! {
    interface IFileStore {
        function getChunkHash(bytes name, uint256 chunkId) external view returns (bytes32);
        function writeChunk(bytes name, uint256 chunkId, bytes data) external payable;
        function remove(bytes name) external returns (uint256);
        function countChunks(bytes name) external view returns (uint256);
        function getAuthorFiles(address author)
            external
            view
            returns (uint256[] times, bytes[] names, bytes[] urls);
    }
}

use IFileStore::{
    countChunksCall, getAuthorFilesCall, getChunkHashCall, removeCall, writeChunkCall,
};

impl From<alloy_sol_types::Error> for ProtocolError {
    fn from(e: alloy_sol_types::Error) -> Self {
        ProtocolError::Abi(e.to_string())
    }
}

fn name_bytes(name: &FileName) -> Bytes {
    Bytes::copy_from_slice(name.as_bytes())
}

pub fn get_chunk_hash(name: &FileName, index: u64) -> Vec<u8> {
    getChunkHashCall {
        name: name_bytes(name),
        chunkId: U256::from(index),
    }
    .abi_encode()
}

pub fn write_chunk(name: &FileName, index: u64, data: &[u8]) -> Vec<u8> {
    writeChunkCall {
        name: name_bytes(name),
        chunkId: U256::from(index),
        data: Bytes::copy_from_slice(data),
    }
    .abi_encode()
}

pub fn remove(name: &FileName) -> Vec<u8> {
    removeCall {
        name: name_bytes(name),
    }
    .abi_encode()
}

pub fn count_chunks(name: &FileName) -> Vec<u8> {
    countChunksCall {
        name: name_bytes(name),
    }
    .abi_encode()
}

pub fn get_author_files(author: &Address) -> Vec<u8> {
    getAuthorFilesCall { author: *author }.abi_encode()
}

/// Decodes the `bytes32` returned by `getChunkHash`.
pub fn decode_chunk_hash(data: &[u8]) -> Result<Digest, ProtocolError> {
    Ok(getChunkHashCall::abi_decode_returns(data, false)?._0)
}

/// Decodes the `uint256` returned by `countChunks`; it must fit in 64 bits.
pub fn decode_chunk_count(data: &[u8]) -> Result<u64, ProtocolError> {
    to_u64(countChunksCall::abi_decode_returns(data, false)?._0)
}

/// Decodes the `getAuthorFiles` listing.
///
/// Lengths are returned as found; checking they agree is up to the caller.
pub fn decode_author_files(data: &[u8]) -> Result<AuthorFiles, ProtocolError> {
    let ret = getAuthorFilesCall::abi_decode_returns(data, false)?;
    Ok(AuthorFiles {
        times: ret.times.into_iter().map(to_u64).collect::<Result<_, _>>()?,
        names: to_strings(ret.names)?,
        urls: to_strings(ret.urls)?,
    })
}

fn to_u64(v: U256) -> Result<u64, ProtocolError> {
    u64::try_from(v).map_err(|_| ProtocolError::Abi(format!("integer {v} does not fit in 64 bits")))
}

fn to_strings(items: Vec<Bytes>) -> Result<Vec<String>, ProtocolError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, b)| {
            String::from_utf8(b.to_vec())
                .map_err(|e| ProtocolError::Abi(format!("element {i} is not UTF-8: {e}")))
        })
        .collect()
}
