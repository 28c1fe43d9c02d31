//! HTTP plumbing shared by the link checker and the scrapers.
//!
//! The link checker only needs two verbs and a status/body pair, so it talks
//! to an [`HttpTransport`] instead of `reqwest` directly. Tests substitute a
//! scripted transport; production uses [`ReqwestTransport`].

use crate::error::ScrapeError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Status code and (for GET) the decoded body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// `None` for HEAD responses.
    pub body: Option<String>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Option<String>) -> Self {
        Self { status, body }
    }
}

/// A request that produced no HTTP response at all (DNS, TLS, timeout, …).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError(format!("request timed out: {e}"))
        } else {
            TransportError(e.to_string())
        }
    }
}

/// The two requests the link checker issues.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a HEAD request, following redirects.
    async fn head(&self, url: &str) -> Result<HttpResponse, TransportError>;

    /// Issue a GET request, following redirects, and capture the body.
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// Resolve `path` against `base_url`, which may lack a trailing slash.
pub fn page_url(base_url: &str, path: &str) -> Result<Url, ScrapeError> {
    let base = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|b| b.join(path))
        .map_err(|e| ScrapeError::InvalidUrl(format!("{base}{path}: {e}")))
}

/// GET a page to scrape. A transport failure or a non-2xx status is a
/// [`ScrapeError::Fetch`].
pub async fn fetch_page<T: HttpTransport + ?Sized>(transport: &T, url: &str) -> Result<String, ScrapeError> {
    let resp = transport.get(url).await.map_err(|e| ScrapeError::Fetch {
        url: url.to_string(),
        detail: e.to_string(),
    })?;
    if !(200..300).contains(&resp.status) {
        return Err(ScrapeError::Fetch {
            url: url.to_string(),
            detail: format!("HTTP status {}", resp.status),
        });
    }
    Ok(resp.body.unwrap_or_default())
}

/// Build the shared `reqwest` client: fixed User-Agent, per-request timeout,
/// default redirect policy.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}

/// [`HttpTransport`] over a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
        })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn head(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let resp = self.client.head(url).send().await?;
        let status = resp.status().as_u16();
        debug!("HEAD {} → {}", url, status);
        Ok(HttpResponse::new(status, None))
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        debug!("GET {} → {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse::new(status, Some(body)))
    }
}
