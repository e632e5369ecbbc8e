use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ota_installer::config::{
    ServerConfig, DEFAULT_BASE_URL, DEFAULT_PORT, DEFAULT_UPLOAD_DIR, EXPIRY_DELAY_SECS,
    MAX_UPLOAD_BYTES,
};
use ota_installer::engine::{reclaim_leftovers, ExpiryScheduler, Ingestor};
use ota_installer::server::InstallServer;
use ota_installer::store::{ArtifactStore, FsArtifactStore};

/// Serve iOS archives for over-the-air installation.
#[derive(Debug, Parser)]
#[command(name = "ota-installer", version, about)]
struct Cli {
    /// Externally reachable origin used in returned links
    #[arg(long, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Port to listen on (all interfaces)
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory holding uploaded archives and manifests
    #[arg(long, env = "UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
    upload_dir: String,

    /// Seconds before an uploaded pair is deleted
    #[arg(long, env = "EXPIRY_SECS", default_value_t = EXPIRY_DELAY_SECS)]
    expiry_secs: u64,

    /// Maximum upload size in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            base_url: cli.base_url,
            port: cli.port,
            upload_dir: cli.upload_dir,
            expiry_secs: cli.expiry_secs,
            max_upload_bytes: cli.max_upload_bytes,
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,hyper=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = ServerConfig::from(Cli::parse());

    let fs_store = Arc::new(
        FsArtifactStore::new(&config.upload_dir)
            .with_context(|| format!("cannot open upload dir {}", config.upload_dir))?,
    );
    let store: Arc<dyn ArtifactStore> = fs_store.clone();
    let scheduler = ExpiryScheduler::new(store.clone(), Duration::from_secs(config.expiry_secs));
    reclaim_leftovers(&fs_store, &scheduler).await?;

    let base_url = config.normalized_base_url();
    info!(
        "serving uploads from {} as {} (expiry {}s)",
        config.upload_dir, base_url, config.expiry_secs
    );
    let ingestor = Arc::new(Ingestor::new(store, scheduler, base_url));

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let server = InstallServer::start(addr, ingestor, config.max_upload_bytes).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    server.shutdown();
    Ok(())
}
