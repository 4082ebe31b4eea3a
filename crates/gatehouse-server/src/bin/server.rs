//! Gatehouse server binary.

use anyhow::{bail, Result};
use gatehouse_common_log::LogConfig;
use gatehouse_server::config::{load_config, validate_config};
use gatehouse_server::Server;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = load_config()?;

    let log_config =
        LogConfig::from_env().with_overrides(&config.logging.level, &config.logging.format);
    gatehouse_common_log::init(log_config)?;

    if let Err(errors) = validate_config(&config) {
        for err in &errors {
            error!(error = %err, "Invalid configuration");
        }
        bail!("{} configuration error(s)", errors.len());
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pdp_mode = ?config.pdp.mode,
        list_strategy = ?config.pdp.list_strategy,
        "Starting Gatehouse server"
    );

    let server = Server::new(config)?;
    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}
