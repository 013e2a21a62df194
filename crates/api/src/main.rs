//! OBD Gateway - Main Entry Point

use anyhow::Context;
use obd_gateway::{init_logging, run_server, GatewayConfig};
use obd_protocol::SerialDriver;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    info!("=== OBD Gateway v{} ===", env!("CARGO_PKG_VERSION"));

    let config = GatewayConfig::load().context("loading configuration")?;
    info!(
        port = ?config.adapter.port,
        protocol = %config.adapter.protocol,
        "Adapter configuration loaded"
    );

    run_server(config, Arc::new(SerialDriver))
        .await
        .context("API server failed")?;

    Ok(())
}
