//! CrUX Collector - scheduled Core Web Vitals ETL
//!
//! Pulls field data for every tracked page from the upstream Chrome UX
//! Report API, merges the per-device answers into one record per page and
//! hands it to the local storage service.

// Module declarations
pub mod collection;
pub mod domain;
pub mod infrastructure;

use anyhow::Context;
use tracing::info;

pub use collection::{CollectionOrchestrator, CollectionScheduler, RunSummary};
pub use infrastructure::AppConfig;

/// Run the collector until shutdown
///
/// With scheduling disabled this performs a single run and returns.
/// Otherwise it runs on the configured cron schedule until Ctrl-C.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let orchestrator = CollectionOrchestrator::from_config(&config)?;

    if !config.schedule.enabled {
        info!("Scheduling disabled, running a single collection");
        orchestrator.run().await;
        return Ok(());
    }

    let mut scheduler = CollectionScheduler::new(orchestrator, &config.schedule).await?;
    scheduler.start().await?;

    if let Some(next) = scheduler.next_run().await {
        info!("Next scheduled collection at {}", next);
    }

    if config.schedule.run_on_startup {
        info!("Running startup collection");
        scheduler.trigger_now().await;
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown requested, stopping scheduler");
    scheduler.shutdown().await
}
