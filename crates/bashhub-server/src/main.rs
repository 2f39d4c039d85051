//! bashhub-server
//!
//! HTTP server for bashhub shell clients.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use bashhub_core::config::{DEFAULT_LISTEN_URL, default_database_path, listen_addr};
use bashhub_core::tracing_init::{DEFAULT_FILTER, init_tracing};
use bashhub_server::server::{AppState, DEFAULT_REQUEST_TIMEOUT, build_router};
use bashhub_server::storage::HistoryDatabase;

#[derive(Parser, Debug)]
#[command(name = "bashhub-server")]
#[command(version, about = "Self-hosted bashhub server - shell history storage and search")]
struct Args {
    /// Address to listen on; a leading http:// is ignored.
    #[arg(short, long, env = "BH_SERVER_URL", default_value = DEFAULT_LISTEN_URL)]
    addr: String,

    /// Database location: a file path, or a postgres:// URI.
    #[arg(long, env = "BH_SERVER_DB")]
    db: Option<String>,

    /// Per-request deadline in seconds.
    #[arg(long, env = "BH_SERVER_REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    request_timeout: u64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(DEFAULT_FILTER, args.log_json);

    let addr = listen_addr(&args.addr);
    info!(version = env!("CARGO_PKG_VERSION"), %addr, "Starting bashhub-server");

    let db_uri = match args.db {
        Some(uri) => uri,
        None => default_database_path()?.to_string_lossy().into_owned(),
    };
    let db = HistoryDatabase::open(&db_uri)
        .await
        .context("failed to open database")?;
    info!(single_writer = db.single_writer(), "Database ready");

    let state = AppState::new(db, Duration::from_secs(args.request_timeout))
        .await
        .context("failed to load signing secret")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
