use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use labwatch::{
    actors::{BroadcastHandle, ReplayHandle},
    api::{ApiConfig, ApiState, spawn_api_server},
    buffer::FallbackBuffer,
    config::{Config, StorageConfig, read_config_file},
    pipeline::IngestPipeline,
    storage::{StorageBackend, memory::MemoryBackend},
};
use tracing::{debug, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (optional; defaults plus environment otherwise)
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("labwatch", LevelFilter::TRACE),
        ("labwatch_hub", LevelFilter::TRACE),
        ("tower_http", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    }
    .with_env_overrides();
    debug!("effective config: {config:?}");

    let backend = build_backend(&config.storage).await?;
    let buffer = Arc::new(FallbackBuffer::new(&config.buffer.path));
    info!("fallback buffer at {}", buffer.path().display());

    let hub = BroadcastHandle::spawn();
    let pipeline = IngestPipeline::new(Arc::clone(&backend), Arc::clone(&buffer), hub.clone());
    let replay = ReplayHandle::spawn(
        Arc::clone(&buffer),
        Arc::clone(&backend),
        config.buffer.replay_interval(),
    );

    let state = ApiState::new(
        pipeline,
        Arc::clone(&backend),
        hub.clone(),
        replay.clone(),
        config.api.write_timeout(),
    );
    let addr = spawn_api_server(ApiConfig::from(config.api.clone()), state).await?;
    info!("hub ready on {addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");

    if let Err(e) = replay.shutdown().await {
        warn!("failed to stop replay actor: {e:#}");
    }
    if let Err(e) = hub.shutdown() {
        warn!("failed to stop broadcast hub: {e:#}");
    }
    backend.close().await?;

    Ok(())
}

async fn build_backend(config: &StorageConfig) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::None => {
            info!("using in-memory storage, samples are not persisted across restarts");
            Ok(Arc::new(MemoryBackend::new()))
        }

        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => {
            let backend = labwatch::storage::sqlite::SqliteBackend::new(path)
                .await
                .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
            Ok(Arc::new(backend))
        }

        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            anyhow::bail!("SQLite storage requested but the storage-sqlite feature is disabled")
        }
    }
}
