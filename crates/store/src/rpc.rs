//! JSON-RPC client for the file store contract.
//!
//! Reads go through `eth_call`. Writes go through `eth_sendTransaction`
//! signed by an account the node manages, then the receipt is polled
//! until the transaction is mined or the confirmation window closes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chunkdrop_protocol::abi;
use chunkdrop_protocol::{Address, AuthorFiles, Digest, Fee, FileName};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{ChunkStore, StoreError, StoreFuture};

/// Default delay between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default time to wait for a transaction to be mined.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for [`RpcChunkStore`].
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL.
    pub url: String,
    /// File store contract address.
    pub contract: Address,
    /// Signing account; discovered with `eth_accounts` when `None`.
    pub from: Option<Address>,
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
}

impl RpcConfig {
    /// Creates a config with default polling and timeout.
    pub fn new(url: impl Into<String>, contract: Address) -> Self {
        Self {
            url: url.into(),
            contract,
            from: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct Receipt {
    #[serde(default)]
    status: Option<String>,
}

/// [`ChunkStore`] backed by a JSON-RPC node.
pub struct RpcChunkStore {
    http: reqwest::Client,
    config: RpcConfig,
    next_id: AtomicU64,
    signer: OnceCell<Address>,
}

impl RpcChunkStore {
    /// Creates a client; no request is made until the first call.
    pub fn new(config: RpcConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            config,
            next_id: AtomicU64::new(1),
            signer: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Performs one JSON-RPC request and deserializes its result.
    ///
    /// A `null` or absent result deserializes as JSON `null`, so callers
    /// that expect "not yet available" ask for an `Option<T>`.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let resp = self.http.post(&self.config.url).json(&req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        let resp: RpcResponse = serde_json::from_slice(&body)?;
        if let Some(err) = resp.error {
            return Err(StoreError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        if resp.id.as_ref().and_then(Value::as_u64) != Some(id) {
            return Err(StoreError::Decode(format!("{method}: response id mismatch")));
        }

        Ok(serde_json::from_value(resp.result.unwrap_or(Value::Null))?)
    }

    async fn resolve_signer(&self) -> Result<Address, StoreError> {
        if let Some(from) = self.config.from {
            return Ok(from);
        }
        self.signer
            .get_or_try_init(|| async {
                let accounts: Vec<String> = self.request("eth_accounts", json!([])).await?;
                let first = accounts.first().ok_or(StoreError::NoSigner)?;
                first.parse::<Address>().map_err(|e| {
                    StoreError::Decode(format!("invalid account {first}: {e}"))
                })
            })
            .await
            .copied()
    }

    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>, StoreError> {
        let params = json!([
            {
                "to": self.config.contract.to_string(),
                "data": to_hex(&data),
            },
            "latest"
        ]);
        let result: String = self.request("eth_call", params).await?;
        from_hex(&result)
    }

    /// Submits a transaction and waits for its receipt.
    async fn transact(&self, data: Vec<u8>, value: u128) -> Result<bool, StoreError> {
        let from = self.resolve_signer().await?;
        let params = json!([{
            "from": from.to_string(),
            "to": self.config.contract.to_string(),
            "data": to_hex(&data),
            "value": format!("{value:#x}"),
        }]);
        let tx_hash: String = self.request("eth_sendTransaction", params).await?;
        info!(tx = %tx_hash, "transaction submitted");

        let timeout = self.config.confirmation_timeout;
        match tokio::time::timeout(timeout, self.poll_receipt(&tx_hash)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(tx = %tx_hash, ?timeout, "no receipt before timeout");
                Err(StoreError::Timeout(timeout))
            }
        }
    }

    async fn poll_receipt(&self, tx_hash: &str) -> Result<bool, StoreError> {
        loop {
            let receipt: Option<Receipt> = self
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if let Some(receipt) = receipt {
                let success = receipt.status.as_deref() == Some("0x1");
                debug!(tx = %tx_hash, success, "transaction mined");
                return Ok(success);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

fn from_hex(s: &str) -> Result<Vec<u8>, StoreError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|e| StoreError::Decode(format!("invalid hex result: {e}")))
}

impl ChunkStore for RpcChunkStore {
    fn signer(&self) -> StoreFuture<'_, Address> {
        Box::pin(self.resolve_signer())
    }

    fn chunk_hash<'a>(&'a self, name: &'a FileName, index: u64) -> StoreFuture<'a, Digest> {
        Box::pin(async move {
            let ret = self.eth_call(abi::get_chunk_hash(name, index)).await?;
            Ok(abi::decode_chunk_hash(&ret)?)
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
            debug!(file = %name, chunk = index, bytes = data.len(), fee = %fee, "writing chunk");
            self.transact(abi::write_chunk(name, index, data), fee.to_base_units())
                .await
        })
    }

    fn remove<'a>(&'a self, name: &'a FileName) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.transact(abi::remove(name), 0).await
        })
    }

    fn count_chunks<'a>(&'a self, name: &'a FileName) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let ret = self.eth_call(abi::count_chunks(name)).await?;
            Ok(abi::decode_chunk_count(&ret)?)
        })
    }

    fn author_files<'a>(&'a self, author: &'a Address) -> StoreFuture<'a, AuthorFiles> {
        Box::pin(async move {
            let ret = self.eth_call(abi::get_author_files(author)).await?;
            Ok(abi::decode_author_files(&ret)?)
        })
    }
}
