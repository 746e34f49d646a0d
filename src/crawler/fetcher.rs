//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - The `Transport` trait the coordinator fetches through
//! - Building HTTP clients with the configured user agent and timeouts
//! - Redirect handling restricted to the allow-list
//! - Error classification

use crate::config::HttpConfig;
use crate::url::AllowedDomains;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed for one request
pub const MAX_REDIRECTS: usize = 10;

/// Errors for a single fetch; the target is dropped and the crawl continues
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Redirect from {url} refused: {message}")]
    Redirect { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },
}

/// A fetched page
#[derive(Debug, Clone)]
pub struct Document {
    /// URL that was requested
    pub url: Url,

    /// URL after redirects; relative links resolve against this
    pub final_url: Url,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value, if any
    pub content_type: Option<String>,

    /// Decoded response body
    pub body: String,
}

impl Document {
    /// Creates an HTML document served from `url` with status 200
    pub fn html(url: Url, body: impl Into<String>) -> Self {
        Self {
            final_url: url.clone(),
            url,
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.into(),
        }
    }

    /// Returns true when the Content-Type names HTML
    ///
    /// Non-HTML responses are still counted as fetched but are not parsed.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("html"))
            .unwrap_or(false)
    }
}

/// The fetch capability the coordinator calls into
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches a single URL
    async fn fetch(&self, url: &Url) -> Result<Document, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed only while they stay on allowed hosts and only up
/// to [`MAX_REDIRECTS`] hops; anything else fails the request.
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::HttpConfig;
/// use sumi_harvest::crawler::build_http_client;
/// use sumi_harvest::url::AllowedDomains;
///
/// let allowed = AllowedDomains::new(["example.com"]);
/// let client = build_http_client(&HttpConfig::default(), &allowed).unwrap();
/// ```
pub fn build_http_client(
    config: &HttpConfig,
    allowed: &AllowedDomains,
) -> Result<Client, reqwest::Error> {
    let allowed = allowed.clone();
    let redirect_policy = Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            let message = format!("more than {} redirects", MAX_REDIRECTS);
            attempt.error(message)
        } else if allowed.allows(attempt.url()) {
            attempt.follow()
        } else {
            let message = format!("redirect target {} is not an allowed domain", attempt.url());
            attempt.error(message)
        }
    });

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(redirect_policy)
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Transport` backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport from HTTP settings and the crawl allow-list
    pub fn new(config: &HttpConfig, allowed: &AllowedDomains) -> Result<Self, reqwest::Error> {
        build_http_client(config, allowed).map(Self::from_client)
    }

    /// Wraps an existing client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<Document, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        Ok(Document {
            url: url.clone(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

/// Maps a reqwest send error onto the fetch error taxonomy
fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_redirect() {
        FetchError::Redirect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            source: error,
        }
    }
}
