use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logbatch::{
    core::buffer::IngestionBuffer,
    http::build_router,
    persist::{recovery::RecoveryFile, sqlite::SqliteStore},
    runtime::handle::{RuntimeConfig, spawn_ingest},
    types::DEFAULT_THRESHOLD,
};

/// Buffered log ingestion service
#[derive(Parser, Debug)]
#[command(name = "logbatch")]
#[command(about = "Accepts log records over HTTP and writes them to SQLite in batches")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "LOGBATCH_LISTEN", default_value = "0.0.0.0:5000")]
    listen: SocketAddr,

    /// SQLite database holding flushed records
    #[arg(long, env = "LOGBATCH_DB", default_value = "logbatch.db")]
    db: PathBuf,

    /// Recovery file mirroring the pending buffer
    #[arg(long, env = "LOGBATCH_BUFFER_FILE", default_value = "buffer.json")]
    buffer_file: PathBuf,

    /// Pending-record count that triggers a batch write
    #[arg(long, env = "LOGBATCH_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    threshold: usize,

    /// Store call timeout in milliseconds (0 disables)
    #[arg(long, env = "LOGBATCH_STORE_TIMEOUT_MS", default_value_t = 5_000)]
    store_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logbatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let store = SqliteStore::open(&cli.db)
        .with_context(|| format!("opening store at {}", cli.db.display()))?;
    let buffer = IngestionBuffer::restore(RecoveryFile::new(&cli.buffer_file), cli.threshold);
    tracing::info!(
        pending = buffer.len(),
        threshold = buffer.threshold(),
        "Ingestion buffer ready"
    );

    let config = RuntimeConfig {
        store_timeout_ms: (cli.store_timeout_ms > 0).then_some(cli.store_timeout_ms),
        ..RuntimeConfig::default()
    };
    let handle = spawn_ingest(buffer, Box::new(store), config);

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("binding {}", cli.listen))?;
    tracing::info!("listening on {}", cli.listen);

    axum::serve(listener, build_router(handle.clone()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("serving HTTP")?;

    handle.shutdown().await?;
    Ok(())
}
