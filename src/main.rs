use anyhow::Context;
use crux_collector_lib::infrastructure::{ConfigLoader, init_logging_with_config, log_system_info};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loader = ConfigLoader::default();
    let config = loader.load().context("Failed to load configuration")?;

    init_logging_with_config(&config.logging)?;
    log_system_info();
    match loader.file() {
        Some(path) => info!("Configuration loaded from {:?}", path),
        None => info!("No configuration file found, using defaults and environment"),
    }

    if let Err(e) = crux_collector_lib::run(config).await {
        error!("Collector stopped: {:#}", e);
        return Err(e);
    }

    Ok(())
}
