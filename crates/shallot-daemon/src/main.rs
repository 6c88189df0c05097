//! shallotd: runs a whole Shallot network in one process.
//!
//! Launches the registry, the configured onion routers and users, each a
//! JSON-RPC service on its own TCP port, and serves until Ctrl-C.

use shallot_daemon::{launch_network, DaemonConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing; RUST_LOG overrides the configured level
    tracing_subscriber::fmt()
        .with_env_filter(config.logging.env_filter()?)
        .init();

    info!("Shallot daemon starting");

    // 3. Launch every actor
    let network = launch_network(&config).await?;
    info!(
        registry = %network.registry.local_addr(),
        "Serving until Ctrl-C"
    );

    // 4. Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    network.shutdown();
    info!("Daemon stopped");
    Ok(())
}
