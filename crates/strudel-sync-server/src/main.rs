//! Strudel Sync - local HTTP endpoint for the strudel-extras userscript.
//!
//! The userscript posts its `localStorage` to `POST /sync` shortly after every
//! change; each user pattern is written to `<DATA_DIR>/<id>.st`.

mod handler;
mod server;

use anyhow::Result;
use clap::Parser;
use server::ServerConfig;
use std::path::PathBuf;
use std::time::Duration;
use strudel_sync_core::{EngineConfig, PersistenceEngine, SyncConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "strudel-sync")]
#[command(about = "Persist Strudel user patterns to one file per pattern")]
struct Args {
    /// Directory the pattern files are written to
    #[arg(default_value = ".")]
    data_dir: PathBuf,

    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = SyncConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = SyncConfig::DEFAULT_HOST)]
    host: String,

    /// Largest accepted request body in bytes
    #[arg(long, default_value_t = SyncConfig::MAX_PAYLOAD_BYTES)]
    max_payload_bytes: usize,

    /// Deadline for each pattern file read or write, in milliseconds
    #[arg(long)]
    io_timeout_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout only carries the port line.
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut engine_config = EngineConfig::new(&args.data_dir);
    if let Some(ms) = args.io_timeout_ms {
        engine_config = engine_config.with_io_timeout(Duration::from_millis(ms));
    }
    let engine = PersistenceEngine::from_config(&engine_config);

    let server_config = ServerConfig {
        host: args.host,
        port: args.port,
        max_payload_bytes: args.max_payload_bytes,
    };
    let addr = server::start_server(engine, &server_config).await?;

    // Print port for supervisors and tests (intentional stdout)
    println!("SYNC_PORT={}", addr.port());

    info!("Syncing patterns to {}", args.data_dir.display());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
