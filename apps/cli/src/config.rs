//! Uploader configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/chunkdrop/config.toml`
//! - Windows: `%APPDATA%/chunkdrop/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chunkdrop_protocol::Address;
use chunkdrop_protocol::constants::{DEFAULT_STORE_HOST, DEFAULT_STORE_PORT};
use chunkdrop_store::RpcConfig;
use chunkdrop_upload::Gateway;
use serde::{Deserialize, Serialize};

/// Uploader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// JSON-RPC endpoint of the node that signs transactions.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// File store contract used when `--contract` is not given.
    #[serde(default)]
    pub contract_address: Option<String>,

    /// Public gateway host used to build file URLs.
    #[serde(default = "default_store_host")]
    pub store_host: String,

    #[serde(default = "default_store_port")]
    pub store_port: u16,

    /// Receipt polling interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long to wait for a transaction to be mined, in seconds.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    /// Signing account. The node's first account is used when unset.
    #[serde(default)]
    pub from: Option<String>,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".into()
}

fn default_store_host() -> String {
    DEFAULT_STORE_HOST.into()
}

fn default_store_port() -> u16 {
    DEFAULT_STORE_PORT
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            contract_address: None,
            store_host: default_store_host(),
            store_port: default_store_port(),
            poll_interval_ms: default_poll_interval_ms(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            from: None,
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Contract address as typed by the user, kept verbatim for URLs.
    pub fn contract(&self) -> anyhow::Result<&str> {
        self.contract_address
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .context("no contract address: pass --contract or set contract_address in the config")
    }

    pub fn gateway(&self) -> Gateway {
        Gateway {
            host: self.store_host.clone(),
            port: self.store_port,
        }
    }

    /// Transport settings for the JSON-RPC store client.
    pub fn rpc_config(&self) -> anyhow::Result<RpcConfig> {
        let contract: Address = self
            .contract()?
            .parse()
            .context("invalid contract address")?;

        let mut rpc = RpcConfig::new(self.rpc_url.clone(), contract);
        rpc.from = self
            .from
            .as_deref()
            .map(str::parse::<Address>)
            .transpose()
            .context("invalid signer address")?;
        rpc.poll_interval = Duration::from_millis(self.poll_interval_ms);
        rpc.confirmation_timeout = Duration::from_secs(self.confirmation_timeout_secs);
        Ok(rpc)
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("chunkdrop")
            .join("config.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("chunkdrop").join("config.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("chunkdrop")
            .join("config.toml"))
    }
}
