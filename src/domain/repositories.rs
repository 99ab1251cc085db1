//! Repository interfaces for the collector
//!
//! Contains trait definitions for the two remote collaborators: the local
//! storage service owning tracked pages and records, and the upstream field
//! data API.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::metrics::DeviceClass;
use crate::domain::page::Page;
use crate::domain::records::{DeviceRecord, StoredRecordRequest};

#[async_trait]
pub trait PageRepository: Send + Sync {
    /// `GET /pages`
    async fn list_pages(&self) -> Result<Vec<Page>>;

    /// `POST /records`, returning the service's parsed response body
    async fn store_record(&self, request: &StoredRecordRequest) -> Result<serde_json::Value>;
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Field data for `origin` segmented to a single form factor
    async fn query_record(&self, origin: &str, device: DeviceClass) -> Result<DeviceRecord>;
}
