use iwc_engine::encode_metrics;
use iwc_engine::register_custom_metrics;
use iwc_engine::BusConfig;
use iwc_engine::ElectedRole;
use iwc_engine::Error;
use iwc_engine::NodeBuilder;
use iwc_engine::Result;
use iwc_engine::REGISTRY;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    // Initializing Logs
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = BusConfig::new()?;
    if let Some(path) = std::env::args().nth(1) {
        info!("with_override_config from: {}", &path);
        config = config.with_override_config(&path)?;
    }
    let config = config.validate()?;
    debug!(?config, "configuration loaded");

    if let Err(e) = register_custom_metrics(&REGISTRY) {
        error!("metrics registration failed: {}", e);
    }

    // Build Node
    let (node, mut outbound) = NodeBuilder::new(config).build()?;

    // Standalone process: no election peer, so this replica leads every directory
    node.set_role(ElectedRole::Leader);

    tokio::spawn(async move {
        while let Some(packet) = outbound.recv().await {
            info!(
                src = %packet.src,
                dst = %packet.dst,
                resource = %packet.resource(),
                response = ?packet.response,
                "outbound packet"
            );
        }
    });

    info!("Bus node started. Waiting for CTRL+C signal...");
    wait_for_signal().await?;

    node.shutdown().await?;
    debug!("final metrics:\n{}", encode_metrics(&REGISTRY));
    info!("Shutdown completed");
    Ok(())
}

async fn wait_for_signal() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| Error::Fatal(format!("SIGINT handler: {e}")))?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| Error::Fatal(format!("SIGTERM handler: {e}")))?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }
    Ok(())
}
