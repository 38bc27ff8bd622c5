//! HTTP client adapter
//!
//! Issues exactly one request per call and never fails on a non-2xx status:
//! the caller gets status, headers and decoded body back uniformly and decides
//! what an error response means. Only transport failures surface as `Err`.

use super::throttle::{Throttle, ThrottleConfig};
use crate::error::Result;
use crate::types::{JsonValue, Method, OrderedStringMap, StringMap};
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Outbound request budget
    pub throttle: Option<ThrottleConfig>,
    /// Default headers for all requests
    pub default_headers: StringMap,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            throttle: None,
            default_headers: StringMap::new(),
            user_agent: format!("pagewalk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Pace fetches with a request budget
    pub fn throttle(mut self, config: ThrottleConfig) -> Self {
        self.config.throttle = Some(config);
        self
    }

    /// Fetch without pacing
    pub fn unthrottled(mut self) -> Self {
        self.config.throttle = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// One outbound page request
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// HTTP method
    pub method: Method,
    /// Fully built target URL
    pub url: &'a Url,
    /// Request headers
    pub headers: &'a OrderedStringMap,
    /// Optional body, dropped for GET/HEAD
    pub body: Option<&'a JsonValue>,
}

/// Uniform response returned for every status code
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Decoded body: JSON when parseable, a JSON string otherwise, null when empty
    pub body: JsonValue,
}

impl HttpResponse {
    /// Status is 400 or above
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Get a header value as a string (case-insensitive name)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// HTTP client used by the orchestrator for page fetches
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    throttle: Option<Throttle>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let throttle = config.throttle.as_ref().map(Throttle::new);

        Ok(Self {
            client,
            config,
            throttle,
        })
    }

    /// Fetch a single page
    pub async fn fetch(&self, request: PageRequest<'_>) -> Result<HttpResponse> {
        if let Some(throttle) = &self.throttle {
            throttle.until_ready().await;
        }

        let mut req = self
            .client
            .request(request.method.into(), request.url.as_str());

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if request.method.sends_body() {
            match request.body {
                Some(JsonValue::String(raw)) => req = req.body(raw.clone()),
                Some(JsonValue::Null) | None => {}
                Some(body) => req = req.json(body),
            }
        }

        let response = req.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await?;

        debug!(
            method = %request.method,
            url = %request.url,
            status,
            bytes = text.len(),
            "page response received"
        );

        Ok(HttpResponse {
            status,
            headers,
            body: decode_body(&text),
        })
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("throttled", &self.throttle.is_some())
            .finish_non_exhaustive()
    }
}

/// Decode a response body leniently
pub(crate) fn decode_body(text: &str) -> JsonValue {
    if text.trim().is_empty() {
        return JsonValue::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| JsonValue::String(text.to_string()))
}

