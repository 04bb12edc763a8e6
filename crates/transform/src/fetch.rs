//! Outbound HTTP capability
//!
//! Steps never hold an HTTP client of their own; they call
//! [`InvocationContext::fetch`](crate::InvocationContext::fetch) so the host
//! decides timeouts, proxies and request logging. [`HttpFetch`] is the
//! default implementation on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use ferry_protocol::AnalyticsEvent;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::FunctionError;

#[cfg(test)]
#[path = "fetch_test.rs"]
mod tests;

/// Errors raised before a response is available
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<FetchError> for FunctionError {
    fn from(err: FetchError) -> Self {
        FunctionError::other(err.to_string())
    }
}

/// Outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: "POST".into(),
            url: url.into(),
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header with this name, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Response to a [`FetchRequest`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl FetchResponse {
    /// True for 2xx statuses
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Per-request options
#[derive(Debug, Clone, PartialEq)]
pub struct FetchExtras {
    /// Log the request through the host's request log
    pub log: bool,
    /// Event the request is made on behalf of
    pub event: Option<AnalyticsEvent>,
}

impl Default for FetchExtras {
    fn default() -> Self {
        Self {
            log: true,
            event: None,
        }
    }
}

impl FetchExtras {
    /// Extras that suppress request logging
    pub fn silent() -> Self {
        Self {
            log: false,
            event: None,
        }
    }
}

/// Outbound HTTP capability
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(
        &self,
        request: FetchRequest,
        extras: Option<FetchExtras>,
    ) -> Result<FetchResponse, FetchError>;
}

/// Default timeout for [`HttpFetch`]
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Fetch`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetch {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetch {
    /// Create a client with the given request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built (TLS setup)
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ferry/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::InvalidRequest(format!("HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if err.is_builder() {
            FetchError::InvalidRequest(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Fetch for HttpFetch {
    async fn fetch(
        &self,
        request: FetchRequest,
        extras: Option<FetchExtras>,
    ) -> Result<FetchResponse, FetchError> {
        let extras = extras.unwrap_or_default();
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| FetchError::InvalidRequest(format!("method '{}'", request.method)))?;

        if extras.log {
            debug!(
                method = %method,
                url = %request.url,
                message_id = extras.event.as_ref().and_then(|e| e.message_id()),
                "fetch"
            );
        }

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        Ok(FetchResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
