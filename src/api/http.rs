use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::request::{ApiRequest, ApiTransport, Method, RequestOutcome, classify_response};
use crate::config::ApiConfig;
use crate::error::ClientError;

/// Transport settings for the reporting API
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL every request path is resolved against
    pub base_url: String,
    /// Require HTTPS for all requests
    pub require_https: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum response size in bytes
    pub max_response_size: usize,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

impl From<&ApiConfig> for HttpTransportConfig {
    fn from(api: &ApiConfig) -> Self {
        Self {
            base_url: api.base_url.clone(),
            require_https: api.require_https,
            timeout_secs: api.timeout_secs,
            max_response_size: api.max_response_size,
        }
    }
}

/// reqwest-backed transport for the reporting API
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Create a new transport with validated base URL
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url)?;

        if config.require_https && base_url.scheme() != "https" {
            return Err(anyhow::anyhow!(
                "HTTPS is required but base URL uses {}: {}",
                base_url.scheme(),
                base_url
            ));
        }

        let mut client_builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("traffic-watch/", env!("CARGO_PKG_VERSION")));

        if config.require_https {
            client_builder = client_builder.https_only(true);
            info!("HTTPS enforcement enabled for API communication");
        }

        let client = client_builder
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Resolve a request path against the base URL
    pub fn resolve(&self, path: &str) -> std::result::Result<Url, ClientError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    async fn read_body(&self, response: reqwest::Response) -> std::result::Result<Value, ClientError> {
        let content_length = response.content_length().unwrap_or(0);
        if content_length > self.config.max_response_size as u64 {
            return Err(ClientError::Server {
                status: response.status().as_u16(),
                message: format!(
                    "response too large: {} bytes (max: {})",
                    content_length, self.config.max_response_size
                ),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(format!("failed to read response body: {}", e)))?;

        if bytes.len() > self.config.max_response_size {
            return Err(ClientError::Server {
                status: 200,
                message: format!(
                    "response body too large: {} bytes (max: {})",
                    bytes.len(),
                    self.config.max_response_size
                ),
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        // Error pages are not always JSON; keep the text as the detail
        Ok(serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> RequestOutcome<Value> {
        let url = match self.resolve(&request.path) {
            Ok(url) => url,
            Err(e) => return RequestOutcome::Error(e),
        };

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, url.clone())
            .header("Accept", "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(header) = request.authorization_header() {
            builder = builder.header("Authorization", header);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, url = %url, "Sending API request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %request.method, path = %request.path, "Request failed: {}", e);
                return RequestOutcome::Error(ClientError::Network(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let body = match self.read_body(response).await {
            Ok(body) => body,
            Err(e) => return RequestOutcome::Error(e),
        };

        debug!(method = %request.method, path = %request.path, status = status, "API response");
        classify_response(status, body)
    }
}

/// Parse the base URL so relative paths join beneath it
pub fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).context("Invalid API base URL")?;

    if url.cannot_be_a_base() {
        return Err(anyhow::anyhow!("API base URL cannot be a base: {}", base_url));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
