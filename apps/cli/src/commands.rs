//! Command handlers.

use std::path::PathBuf;

use anyhow::{Context, bail};
use chunkdrop_protocol::{Address, FileName};
use chunkdrop_profile::ProfileService;
use chunkdrop_store::{ChunkStore, RpcChunkStore};
use chunkdrop_upload::{ChunkAction, UploadEvent, UploadPipeline, UploadPlan, UploadRequest};
use tracing::{info, warn};

use crate::cli::{Commands, ConfigCommands};
use crate::config::{self, Config};

pub async fn run(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Upload { file, dir } => upload(&config, file, dir).await,
        Commands::Plan { file, dir, json } => plan(&config, file, dir, json).await,
        Commands::List { author, json } => list(&config, author, json).await,
        Commands::Delete { name } => delete(&config, name).await,
        Commands::Chunks { name } => chunks(&config, name).await,
        Commands::Config { action } => show_config(action, &config),
    }
}

fn connect(config: &Config) -> anyhow::Result<RpcChunkStore> {
    let store = RpcChunkStore::new(config.rpc_config()?)?;
    info!(rpc = %config.rpc_url, contract = %store.config().contract, "using chunk store");
    Ok(store)
}

fn request(config: &Config, file: PathBuf, dir: String) -> anyhow::Result<UploadRequest> {
    Ok(UploadRequest {
        contract_address: config.contract()?.to_string(),
        destination_dir: dir,
        file,
    })
}

async fn upload(config: &Config, file: PathBuf, dir: String) -> anyhow::Result<()> {
    let store = connect(config)?;
    let request = request(config, file, dir)?;

    let mut pipeline = UploadPipeline::new(config.gateway());
    let mut events = pipeline
        .take_events()
        .context("upload event stream unavailable")?;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                UploadEvent::Progress { percent } => println!("chunk {percent} written"),
                UploadEvent::Skipped { index } => println!("chunk {index} unchanged"),
                UploadEvent::Completed { .. } | UploadEvent::Failed { .. } => {}
            }
        }
    });

    let cancel = pipeline.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping before the next chunk");
            cancel.cancel();
        }
    });

    let result = pipeline.upload(&store, &request).await;
    interrupt.abort();

    // Dropping the pipeline closes the event stream so the printer drains.
    drop(pipeline);
    let _ = printer.await;

    let success = result?;
    println!("{}", success.path);
    Ok(())
}

async fn plan(config: &Config, file: PathBuf, dir: String, json: bool) -> anyhow::Result<()> {
    let store = connect(config)?;
    let request = request(config, file, dir)?;

    let plan = UploadPipeline::new(config.gateway())
        .plan(&store, &request)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_plan(plan: &UploadPlan) {
    println!("{}", plan.url);
    for chunk in &plan.chunks {
        let action = match chunk.action {
            ChunkAction::Write { fee } => format!("write, fee {fee}"),
            ChunkAction::Skip => "unchanged".to_string(),
        };
        println!(
            "  #{:<3} {:>8} bytes  {}  {}",
            chunk.index, chunk.len, chunk.digest, action
        );
    }
    println!(
        "{} of {} chunks to write, total fee {}",
        plan.writes(),
        plan.chunks.len(),
        plan.total_fee
    );
}

async fn list(config: &Config, author: Option<String>, json: bool) -> anyhow::Result<()> {
    let store = connect(config)?;
    let author: Address = match author {
        Some(a) => a.parse().context("invalid author address")?,
        None => store.signer().await?,
    };

    let records = ProfileService::new(&store).list(&author).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for record in &records {
            println!(
                "{}\t{}\t{}",
                record.uploaded_at.to_rfc3339(),
                record.name,
                record.url
            );
        }
    }
    Ok(())
}

async fn delete(config: &Config, name: String) -> anyhow::Result<()> {
    let store = connect(config)?;
    let name = FileName::new(name);

    if !ProfileService::new(&store).delete(&name).await? {
        bail!("removal of {name} was not confirmed");
    }
    println!("removed {name}");
    Ok(())
}

async fn chunks(config: &Config, name: String) -> anyhow::Result<()> {
    let store = connect(config)?;
    let count = ProfileService::new(&store)
        .chunk_count(&FileName::new(name))
        .await?;
    println!("{count}");
    Ok(())
}

fn show_config(action: ConfigCommands, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Show => print!("{}", toml::to_string_pretty(config)?),
        ConfigCommands::Path => println!("{}", config::config_path()?.display()),
    }
    Ok(())
}
