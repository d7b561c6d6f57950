//! HTTP fetcher implementation
//!
//! This module handles every request the harvester sends, including:
//! - Building the shared HTTP client with the fixed header set
//! - Classifying one attempt's outcome (transient, forbidden, fatal)
//! - Retrying transient failures through the backoff combinator
//! - Reporting rate limiting once per run

use crate::config::HttpConfig;
use crate::harvest::retry::{retry_with_backoff, RetryError, RetryPolicy, Retryable};
use crate::{ConfigError, HarvestError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER};
use reqwest::{Client, Method, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur while fetching a page
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("HTTP 403 Forbidden, possible rate limiting: {0}")]
    Forbidden(String),

    #[error("Fatal failure: {0}")]
    Fatal(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// Returns true for failures a later run may recover from
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transient(_) | Self::Forbidden(_) | Self::Exhausted { .. }
        )
    }
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Forbidden(_))
    }
}

impl From<RetryError<FetchError>> for FetchError {
    fn from(err: RetryError<FetchError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => Self::Exhausted {
                attempts,
                last: Box::new(last),
            },
            RetryError::Permanent(e) => e,
        }
    }
}

/// One request to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,

    /// URL-encoded form body (POST only)
    pub form_body: Option<String>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            form_body: None,
        }
    }

    pub fn post_form(url: Url, body: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            url,
            form_body: Some(body.into()),
        }
    }
}

/// A well-formed response; payload interpretation is left to the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one attempt of a request
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &FetchRequest) -> Result<RawResponse, FetchError>;
}

/// Fetches a request to completion, retries included
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<RawResponse, FetchError>;
}

/// Builds an HTTP client with the fixed header set
///
/// # Arguments
///
/// * `config` - The HTTP header configuration
/// * `timeout` - Bound applied to every single attempt
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(HarvestError)` - A header value is invalid or the client failed to build
pub fn build_http_client(config: &HttpConfig, timeout: Duration) -> Result<Client, HarvestError> {
    let header = |name: &str, value: &str| {
        HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("http.{} is not a valid header value", name))
        })
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    headers.insert(ACCEPT, header("accept", &config.accept)?);
    headers.insert(REFERER, header("referer", &config.referer)?);
    headers.insert(ORIGIN, header("origin", &config.origin)?);

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Classifies a response status
///
/// | Status | Outcome |
/// |--------|---------|
/// | 2xx | success |
/// | 403 | `Forbidden` (retried, reported once per run) |
/// | 408, 429, 5xx | `Transient` (retried) |
/// | other | `Fatal` |
pub fn classify_status(status: StatusCode, url: &Url) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }

    let detail = format!("HTTP {} from {}", status.as_u16(), url);
    match status {
        StatusCode::FORBIDDEN => Err(FetchError::Forbidden(detail)),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            Err(FetchError::Transient(detail))
        }
        s if s.is_server_error() => Err(FetchError::Transient(detail)),
        _ => Err(FetchError::Fatal(detail)),
    }
}

/// Classifies a network-level failure; all of them are worth retrying
fn classify_network_error(e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Transient("Request timeout".to_string())
    } else if e.is_connect() {
        FetchError::Transient(format!("Connection failed: {}", e))
    } else {
        FetchError::Transient(e.to_string())
    }
}

/// Transport backed by a shared `reqwest::Client`
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &FetchRequest) -> Result<RawResponse, FetchError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        if let Some(body) = &request.form_body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_network_error(&e))?;

        let status = response.status();
        classify_status(status, &request.url)?;

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transient(format!("Failed to read body: {}", e)))?;

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Wraps a transport with exponential-backoff retries
pub struct RetryingFetcher<T> {
    transport: T,
    policy: RetryPolicy,
    rate_limit_reported: AtomicBool,
}

impl<T: Transport> RetryingFetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            rate_limit_reported: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns true once a rate-limit notice has been emitted
    pub fn rate_limit_reported(&self) -> bool {
        self.rate_limit_reported.load(Ordering::Relaxed)
    }

    fn report_rate_limit(&self) {
        if !self.rate_limit_reported.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "Remote service answered 403 Forbidden; requests are probably being rate limited. \
                 Consider lowering concurrency or raising the inter-page delay."
            );
        }
    }
}

#[async_trait]
impl<T: Transport> Fetcher for RetryingFetcher<T> {
    async fn fetch(&self, request: &FetchRequest) -> Result<RawResponse, FetchError> {
        let label = format!("{} {}", request.method, request.url);

        let result = retry_with_backoff(&self.policy, &label, |attempt| async move {
            tracing::trace!("Attempt {} for {}", attempt, request.url);
            let outcome = self.transport.send(request).await;
            if let Err(FetchError::Forbidden(_)) = &outcome {
                self.report_rate_limit();
            }
            outcome
        })
        .await;

        result.map_err(FetchError::from)
    }
}
