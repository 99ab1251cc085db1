//! Client for the upstream field data API (`records:queryRecord`)

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::domain::{DeviceClass, DeviceRecord, QueryRecordResponse, RecordSource};
use crate::infrastructure::config::{ApiKey, UpstreamConfig};
use crate::infrastructure::http_client::{ClientError, HttpClient, HttpClientConfig, join_base_url};

const QUERY_RECORD_PATH: &str = "v1/records:queryRecord";

/// Body of a `records:queryRecord` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecordRequest<'a> {
    pub origin: &'a str,
    pub form_factor: DeviceClass,
}

pub struct CruxApiClient {
    http: HttpClient,
    endpoint: Url,
    api_key: ApiKey,
}

impl CruxApiClient {
    pub fn new(config: &UpstreamConfig, api_key: ApiKey) -> Result<Self, ClientError> {
        let http = HttpClient::new(HttpClientConfig {
            user_agent: config.user_agent.clone(),
            timeout_seconds: config.timeout_seconds,
            max_requests_per_second: Some(config.max_requests_per_second),
        })?;

        Ok(Self {
            http,
            endpoint: query_record_endpoint(&config.base_url)?,
            api_key,
        })
    }

    /// Endpoint carrying the credential, never logged as-is
    fn authorized_endpoint(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose());
        url
    }
}

/// `<base>/v1/records:queryRecord`
pub fn query_record_endpoint(base_url: &str) -> Result<Url, ClientError> {
    join_base_url(base_url, QUERY_RECORD_PATH)
}

#[async_trait]
impl RecordSource for CruxApiClient {
    async fn query_record(&self, origin: &str, device: DeviceClass) -> Result<DeviceRecord> {
        let body = QueryRecordRequest {
            origin,
            form_factor: device,
        };

        tracing::debug!("Querying {} field data for {}", device, origin);
        let response: QueryRecordResponse = self
            .http
            .post_json(&self.authorized_endpoint(), &body)
            .await?;

        Ok(response.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CruxApiClient {
        CruxApiClient::new(&UpstreamConfig::default(), ApiKey::new("k3y")).unwrap()
    }

    #[test]
    fn endpoint_joins_base_and_method() {
        let url = query_record_endpoint("https://chromeuxreport.googleapis.com").unwrap();
        assert_eq!(
            url.as_str(),
            "https://chromeuxreport.googleapis.com/v1/records:queryRecord"
        );

        let with_slash = query_record_endpoint("http://localhost:8080/").unwrap();
        assert_eq!(
            with_slash.as_str(),
            "http://localhost:8080/v1/records:queryRecord"
        );
    }

    #[test]
    fn endpoint_rejects_garbage_base() {
        assert!(matches!(
            query_record_endpoint("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn credential_travels_as_key_query_parameter() {
        let url = client().authorized_endpoint();
        assert_eq!(url.query(), Some("key=k3y"));
        assert_eq!(url.path(), "/v1/records:queryRecord");
    }

    #[test]
    fn request_body_matches_upstream_contract() {
        let body = QueryRecordRequest {
            origin: "https://a.test",
            form_factor: DeviceClass::Phone,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "origin": "https://a.test", "formFactor": "PHONE" })
        );
    }
}
