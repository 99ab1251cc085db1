//! # Collection Scheduler
//!
//! Fires a collection run on a cron schedule. Every tick starts an
//! independent run; nothing is carried between runs.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};
use uuid::Uuid;

use crate::collection::orchestrator::{CollectionOrchestrator, RunSummary};
use crate::infrastructure::config::ScheduleConfig;

pub struct CollectionScheduler {
    scheduler: JobScheduler,
    job_id: Uuid,
    orchestrator: CollectionOrchestrator,
}

impl CollectionScheduler {
    /// Register the collection job; fails on an invalid cron expression
    pub async fn new(orchestrator: CollectionOrchestrator, config: &ScheduleConfig) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create job scheduler: {e:?}"))?;

        let job_orchestrator = orchestrator.clone();
        let job = Job::new_async(config.cron.as_str(), move |_uuid, _lock| {
            let orchestrator = job_orchestrator.clone();
            Box::pin(async move {
                info!("Scheduled collection triggered");
                orchestrator.run().await;
            })
        })
        .map_err(|e| anyhow!("Invalid cron expression '{}': {e:?}", config.cron))?;

        let job_id = scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("Failed to register collection job: {e:?}"))?;

        info!("Collection job registered with schedule '{}' (UTC)", config.cron);
        Ok(Self {
            scheduler,
            job_id,
            orchestrator,
        })
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| anyhow!("Failed to start scheduler: {e:?}"))
    }

    /// Run once now, outside the schedule
    pub async fn trigger_now(&self) -> RunSummary {
        self.orchestrator.run().await
    }

    pub async fn next_run(&mut self) -> Option<DateTime<Utc>> {
        match self.scheduler.next_tick_for_job(self.job_id).await {
            Ok(next) => next,
            Err(e) => {
                warn!("Could not compute next collection time: {:?}", e);
                None
            }
        }
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| anyhow!("Failed to stop scheduler: {e:?}"))
    }
}
