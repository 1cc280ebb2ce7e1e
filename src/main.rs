//! Masjid SaaS server
//!
//! Starts the REST API over the Sled-backed entity store.
//! - Storage: Sled trees per collection, with tenant and lookup indexes
//! - Auth: bcrypt passwords, HS256 bearer tokens
//! - Networking: Axum + Tokio on port 11111
//!
//! Usage:
//!   cargo run --bin load_data       # optional: demo rows + sample cash book
//!   cargo run --bin masjid_saas     # start server
//!   cargo run --bin masjid-cli -- --help

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use masjid_saas::auth::TokenIssuer;
use masjid_saas::config::AppConfig;
use masjid_saas::logging;
use masjid_saas::models::ensure_seed_data;
use masjid_saas::rest::create_router;
use masjid_saas::storage::Storage;

/// Command-line overrides; everything else comes from `MASJID_*` variables.
#[derive(Parser)]
#[command(name = "masjid_saas", about = "Multi-tenant mosque administration API", version)]
struct Args {
    /// Address to listen on (overrides MASJID_BIND)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Sled data directory (overrides MASJID_DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Skip writing demo tenants, users and rows
    #[arg(long)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if args.no_seed {
        config.seed_demo_data = false;
    }

    // Guard must outlive the server so buffered file logs are flushed
    let _log_guard = logging::init(&config.log)?;

    info!(
        bind = %config.bind_addr,
        data_dir = %config.data_dir.display(),
        "Masjid SaaS starting"
    );
    if config.uses_dev_secret() {
        warn!("MASJID_JWT_SECRET is not set; using the development secret");
    }

    let storage = Storage::open(&config.data_dir)?;
    if config.seed_demo_data {
        ensure_seed_data(&storage)?;
    }

    let app = create_router(storage.clone(), TokenIssuer::new(&config.auth));
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    storage.flush()?;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler, keep serving instead of shutting down
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}
