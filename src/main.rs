use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;

use where2now::{api, config, db, logging};

/// Clients and delivery points HTTP service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on, overrides BIND_ADDR
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Do not apply pending database migrations on startup
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = config::init()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let log_entries = logging::init(&config)?;
    tracing::info!(env = %config.env, debug = config.debug, "starting where2now");

    // Initialize the store
    let store = db::init(&config, !args.skip_migrations).await?;
    tracing::info!("store ready");

    if let Some(rx) = log_entries {
        logging::spawn_writer(rx, store.clone());
    }

    let app = api::router(api::AppState::new(store));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("HTTP server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
