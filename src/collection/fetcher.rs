//! # Record Fetcher
//!
//! Queries the upstream API once per configured device class for a page, all
//! device calls in flight together, and normalizes each response.

use futures::future::join_all;
use std::sync::Arc;

use crate::collection::merger::DeviceMetrics;
use crate::collection::normalizer::normalize;
use crate::domain::{DeviceClass, NormalizedMetric, Page, RecordSource};

#[derive(Clone)]
pub struct RecordFetcher {
    source: Arc<dyn RecordSource>,
    devices: Vec<DeviceClass>,
}

impl RecordFetcher {
    pub fn new(source: Arc<dyn RecordSource>, devices: Vec<DeviceClass>) -> Self {
        Self { source, devices }
    }

    /// One entry per configured device, in configured order
    ///
    /// A failed call is logged and yields `None` for that device only.
    pub async fn fetch_page(&self, page: &Page) -> Vec<DeviceMetrics> {
        let calls = self.devices.iter().map(|&device| async move {
            let metrics = self.fetch_device(page, device).await;
            (device, metrics)
        });

        join_all(calls).await
    }

    async fn fetch_device(&self, page: &Page, device: DeviceClass) -> Option<Vec<NormalizedMetric>> {
        match self.source.query_record(&page.url, device).await {
            Ok(record) => {
                let metrics = normalize(record, device);
                tracing::debug!("{} {} record: {} metrics", page.url, device, metrics.len());
                Some(metrics)
            }
            Err(e) => {
                tracing::error!("Failed to fetch {} record for {}: {:#}", device, page.url, e);
                None
            }
        }
    }
}
