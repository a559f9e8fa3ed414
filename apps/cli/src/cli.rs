use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(author, version, about = "Upload files to a chunked on-chain file store", long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON-RPC endpoint of the signing node
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// File store contract address
    #[arg(long, global = true)]
    pub contract: Option<String>,

    /// Signing account (defaults to the node's first account)
    #[arg(long, global = true)]
    pub from: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a file, writing only chunks that changed
    Upload {
        file: PathBuf,
        /// Destination directory, prepended verbatim to the file name (e.g. "docs/")
        #[arg(long, default_value = "")]
        dir: String,
    },
    /// Show which chunks an upload would write and what it would cost
    Plan {
        file: PathBuf,
        #[arg(long, default_value = "")]
        dir: String,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// List files uploaded by an account
    List {
        /// Author address; defaults to the signing account
        author: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Remove a stored file and all of its chunks
    Delete {
        /// Full stored name, including the destination directory
        name: String,
    },
    /// Print how many chunks the store holds for a file
    Chunks { name: String },
    /// Inspect the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print the configuration file location
    Path,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(contract) = &self.contract {
            config.contract_address = Some(contract.clone());
        }
        if let Some(from) = &self.from {
            config.from = Some(from.clone());
        }
    }
}
