//! Client for the local storage service owning pages and records

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::domain::{Page, PageRepository, StoredRecordRequest};
use crate::infrastructure::config::{StorageConfig, defaults};
use crate::infrastructure::http_client::{ClientError, HttpClient, HttpClientConfig, join_base_url};

pub struct StorageServiceClient {
    http: HttpClient,
    pages_url: Url,
    records_url: Url,
}

impl StorageServiceClient {
    pub fn new(config: &StorageConfig) -> Result<Self, ClientError> {
        let http = HttpClient::new(HttpClientConfig {
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_seconds: config.timeout_seconds,
            max_requests_per_second: None,
        })?;

        Ok(Self {
            http,
            pages_url: join_base_url(&config.base_url, "pages")?,
            records_url: join_base_url(&config.base_url, "records")?,
        })
    }

    pub fn pages_url(&self) -> &Url {
        &self.pages_url
    }

    pub fn records_url(&self) -> &Url {
        &self.records_url
    }
}

#[async_trait]
impl PageRepository for StorageServiceClient {
    async fn list_pages(&self) -> Result<Vec<Page>> {
        let pages: Vec<Page> = self.http.get_json(&self.pages_url).await?;
        tracing::debug!("Storage service listed {} pages", pages.len());
        Ok(pages)
    }

    async fn store_record(&self, request: &StoredRecordRequest) -> Result<serde_json::Value> {
        let response = self.http.post_json(&self.records_url, request).await?;
        Ok(response)
    }
}
