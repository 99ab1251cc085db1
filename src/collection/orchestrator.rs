//! # Collection Orchestrator
//!
//! Drives one collection run: list tracked pages, then for every page fetch
//! each device record, merge, and store. Pages run concurrently up to the
//! configured limit. Every remote failure is logged and absorbed so that one
//! page can never abort its siblings.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::collection::fetcher::RecordFetcher;
use crate::collection::merger::merge;
use crate::domain::{MergedMetric, Page, PageRepository, RecordSource, StoredRecordRequest};
use crate::infrastructure::config::{AppConfig, CollectorConfig};
use crate::infrastructure::{CruxApiClient, StorageServiceClient};

/// What happened to one page during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Record posted; `gaps` metrics were missing on some device
    Stored { gaps: usize },
    /// Nothing worth posting (no metrics, or gaps with partial storing disabled)
    Skipped { gaps: usize },
    /// Every device fetch failed, the store call failed, or the task died
    Failed,
}

/// Totals of one collection run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_listed: usize,
    pub pages_stored: usize,
    pub pages_skipped: usize,
    pub pages_failed: usize,
    pub metric_gaps: usize,
}

impl RunSummary {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            pages_listed: 0,
            pages_stored: 0,
            pages_skipped: 0,
            pages_failed: 0,
            metric_gaps: 0,
        }
    }

    fn record(&mut self, outcome: PageOutcome) {
        match outcome {
            PageOutcome::Stored { gaps } => {
                self.pages_stored += 1;
                self.metric_gaps += gaps;
            }
            PageOutcome::Skipped { gaps } => {
                self.pages_skipped += 1;
                self.metric_gaps += gaps;
            }
            PageOutcome::Failed => self.pages_failed += 1,
        }
    }
}

/// Coordinates lister, fetcher, merger and storer for a run
#[derive(Clone)]
pub struct CollectionOrchestrator {
    pages: Arc<dyn PageRepository>,
    fetcher: RecordFetcher,
    config: CollectorConfig,
}

impl CollectionOrchestrator {
    pub fn new(
        pages: Arc<dyn PageRepository>,
        source: Arc<dyn RecordSource>,
        config: CollectorConfig,
    ) -> Self {
        let fetcher = RecordFetcher::new(source, config.devices.clone());
        Self {
            pages,
            fetcher,
            config,
        }
    }

    /// Wire the HTTP clients described by a validated configuration
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let storage = StorageServiceClient::new(&config.storage)?;
        let upstream = CruxApiClient::new(&config.upstream, config.api_key()?.clone())?;

        Ok(Self::new(
            Arc::new(storage),
            Arc::new(upstream),
            config.collector.clone(),
        ))
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Run the whole pipeline once
    ///
    /// Never fails: an unavailable page list counts as zero pages.
    pub async fn run(&self) -> RunSummary {
        let mut summary = RunSummary::start();
        info!("Collection run {} started", summary.run_id);

        info!("Getting pages...");
        let pages = self.list_pages().await.unwrap_or_default();
        summary.pages_listed = pages.len();

        info!("Getting records for {} pages...", pages.len());
        let limit = self.config.max_concurrent_pages.min(pages.len()).max(1);
        let semaphore = Arc::new(Semaphore::new(limit));

        let tasks: Vec<_> = pages
            .into_iter()
            .map(|page| {
                let orchestrator = self.clone();
                let semaphore = Arc::clone(&semaphore);
                let span = info_span!("page", url = %page.url);

                tokio::spawn(
                    async move {
                        let Ok(_permit) = semaphore.acquire_owned().await else {
                            return PageOutcome::Failed;
                        };
                        orchestrator.process_page(&page).await
                    }
                    .instrument(span),
                )
            })
            .collect();

        for result in join_all(tasks).await {
            match result {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    error!("Page pipeline aborted: {}", e);
                    summary.record(PageOutcome::Failed);
                }
            }
        }

        summary.finished_at = Utc::now();
        info!("All records stored.");
        info!(
            "Run {}: {} pages listed, {} stored, {} skipped, {} failed, {} metric gaps",
            summary.run_id,
            summary.pages_listed,
            summary.pages_stored,
            summary.pages_skipped,
            summary.pages_failed,
            summary.metric_gaps
        );
        summary
    }

    /// `GET /pages`; `None` (after logging) on any failure
    pub async fn list_pages(&self) -> Option<Vec<Page>> {
        match self.pages.list_pages().await {
            Ok(pages) => Some(pages),
            Err(e) => {
                error!("Failed to list pages: {:#}", e);
                None
            }
        }
    }

    /// `POST /records` for one page; `None` (after logging) on any failure
    pub async fn store_records(
        &self,
        page: &Page,
        metrics: Vec<MergedMetric>,
    ) -> Option<serde_json::Value> {
        let request = StoredRecordRequest {
            page_id: page.id.clone(),
            metrics,
        };

        match self.pages.store_record(&request).await {
            Ok(response) => Some(response),
            Err(e) => {
                error!("Failed to store records for {}: {:#}", page.url, e);
                None
            }
        }
    }

    /// Fetch, merge and store a single page
    pub async fn process_page(&self, page: &Page) -> PageOutcome {
        info!("Getting records for {}", page.url);
        let device_metrics = self.fetcher.fetch_page(page).await;

        if device_metrics.iter().all(|(_, metrics)| metrics.is_none()) {
            warn!("No device record could be fetched for {}", page.url);
            return PageOutcome::Failed;
        }

        let outcome = merge(device_metrics);
        let gaps = outcome.gaps.len();
        for gap in &outcome.gaps {
            warn!("{}: {}", page.url, gap);
        }

        if outcome.is_empty() {
            warn!("Upstream returned no metrics for {}, nothing to store", page.url);
            return PageOutcome::Skipped { gaps };
        }
        if !outcome.is_complete() && !self.config.store_partial_records {
            warn!(
                "Skipping {} with {} metric gaps (partial records disabled)",
                page.url, gaps
            );
            return PageOutcome::Skipped { gaps };
        }

        info!("Storing records for {}", page.url);
        match self.store_records(page, outcome.metrics).await {
            Some(_) => PageOutcome::Stored { gaps },
            None => PageOutcome::Failed,
        }
    }
}
