//! HTTP client for the collector's JSON APIs with rate limiting and error handling
//!
//! Thin wrapper over `reqwest` shared by the upstream API client and the
//! storage service client. Query strings are stripped from every logged URL
//! since the upstream credential travels there.

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client, Response,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Serialize, de::DeserializeOwned};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failures talking to a remote JSON API
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} from {url}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// `None` disables rate limiting
    pub max_requests_per_second: Option<u32>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        use crate::infrastructure::config::defaults;
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: None,
        }
    }
}

/// JSON-over-HTTP client with optional rate limiting
pub struct HttpClient {
    client: Client,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ClientError::Build(format!("Invalid user agent: {e}")))?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        let rate_limiter = match config.max_requests_per_second {
            Some(rate) => {
                let rate = NonZeroU32::new(rate).ok_or_else(|| {
                    ClientError::Build("Rate limit must be greater than 0".to_string())
                })?;
                Some(RateLimiter::direct(Quota::per_second(rate)))
            }
            None => None,
        };

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    /// `GET` a URL and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ClientError> {
        self.wait_for_permit().await;
        tracing::debug!("GET {}", redact(url));

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        Self::decode(url, response).await
    }

    /// `POST` a JSON body and decode the JSON response
    pub async fn post_json<B, T>(&self, url: &Url, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.wait_for_permit().await;
        tracing::debug!("POST {}", redact(url));

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        Self::decode(url, response).await
    }

    async fn wait_for_permit(&self) {
        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter.until_ready().await;
        }
    }

    async fn decode<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(url, e))?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: redact(url),
                message: error_message(&body),
            });
        }

        tracing::debug!("{} responded {} ({} bytes)", redact(url), status, body.len());

        serde_json::from_str(&body).map_err(|e| ClientError::Decode {
            url: redact(url),
            message: e.to_string(),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

/// The message never embeds the request URL, which may carry the credential
fn transport_error(url: &Url, error: reqwest::Error) -> ClientError {
    let message = if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else {
        error.without_url().to_string()
    };

    ClientError::Transport {
        url: redact(url),
        message,
    }
}

/// `<base>/<path>`, keeping any path prefix of the base and tolerating a trailing slash
pub fn join_base_url(base_url: &str, path: &str) -> Result<Url, ClientError> {
    let base = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|base| base.join(path))
        .map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))
}

/// URL without query string or fragment, safe to log
pub fn redact(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.set_fragment(None);
    clean.to_string()
}

/// Best-effort message from an error body
///
/// Understands the Google API error envelope `{"error": {"message": ..}}`;
/// anything else is returned trimmed and truncated.
pub fn error_message(body: &str) -> String {
    const MAX_LEN: usize = 200;

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .pointer("/error/message")
            .and_then(serde_json::Value::as_str)
        {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_client_creation() {
        let client = HttpClient::new(HttpClientConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limiting_configuration() {
        let config = HttpClientConfig {
            max_requests_per_second: Some(1),
            ..Default::default()
        };

        let client = HttpClient::new(config).unwrap();
        assert_eq!(client.config().max_requests_per_second, Some(1));
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        let config = HttpClientConfig {
            max_requests_per_second: Some(0),
            ..Default::default()
        };
        assert!(matches!(HttpClient::new(config), Err(ClientError::Build(_))));
    }

    #[test]
    fn test_redact_strips_credentials_from_query() {
        let url = Url::parse("https://api.test/v1/records:queryRecord?key=secret#frag").unwrap();
        assert_eq!(redact(&url), "https://api.test/v1/records:queryRecord");
    }

    #[test]
    fn test_error_message_reads_api_envelope() {
        let body = r#"{"error":{"code":404,"message":"chrome ux report data not found","status":"NOT_FOUND"}}"#;
        assert_eq!(error_message(body), "chrome ux report data not found");
    }

    #[test]
    fn test_error_message_falls_back_to_body_text() {
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message(""), "empty response body");
        assert_eq!(error_message(&"x".repeat(500)).len(), 200);
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let client = HttpClient::new(HttpClientConfig {
            timeout_seconds: 2,
            ..Default::default()
        })
        .unwrap();
        let url = Url::parse("http://127.0.0.1:9/v1/records:queryRecord?key=s3cret").unwrap();

        let result: Result<serde_json::Value, _> = client.post_json(&url, &serde_json::json!({})).await;
        let err = result.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));

        let rendered = format!("{err} {err:?}");
        assert!(!rendered.contains("key="));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn test_join_base_url_keeps_prefix_and_handles_slash() {
        let url = join_base_url("http://storage.internal/api/", "pages").unwrap();
        assert_eq!(url.as_str(), "http://storage.internal/api/pages");

        let url = join_base_url("https://chromeuxreport.googleapis.com", "v1/records:queryRecord").unwrap();
        assert_eq!(url.as_str(), "https://chromeuxreport.googleapis.com/v1/records:queryRecord");

        assert!(matches!(join_base_url("not a url", "pages"), Err(ClientError::InvalidUrl(_))));
    }
}
