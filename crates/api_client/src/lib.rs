//! REST client for the space capability backend.
//!
//! Every list endpoint may answer either with a flat JSON array or with a
//! paginated envelope (`{content, totalPages, ...}`). [`ApiClient::fetch_all`]
//! hides the difference and always returns the complete, un-paginated list.
//! No retries happen here; failures go straight back to the caller.

pub mod page;

use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;

use common::config::ApiConfig;
use common::{Error, Result};
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

pub use page::{Page, PageResponse};

/// Anything that can produce the full record list for an endpoint.
///
/// The entity cache is generic over this so tests and alternative
/// backends can stand in for the HTTP client.
pub trait EntitySource: Send + Sync + 'static {
    fn fetch_all(&self, endpoint: &str) -> impl Future<Output = Result<Vec<Value>>> + Send;
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn format_reqwest_error(err: &reqwest::Error) -> String {
    // Keep chained causes so network failures (DNS/TLS/socket) are visible.
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

fn summarize_response_body(raw: &str) -> String {
    const MAX_CHARS: usize = 500;
    let compact = raw.replace(['\n', '\r'], " ");
    match compact.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}…", &compact[..cut]),
        None => compact,
    }
}

/// Async client for the capability REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
    timeout_secs: u64,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url),
            page_size: config.page_size.max(1),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL for one page of an endpoint. Endpoints may already carry a query.
    fn page_url(&self, endpoint: &str, page: u32) -> String {
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        let slash = if endpoint.starts_with('/') { "" } else { "/" };
        format!(
            "{}{}{}{}page={}&size={}",
            self.base_url, slash, endpoint, separator, page, self.page_size
        )
    }

    async fn get_page(&self, endpoint: &str, page: u32) -> Result<PageResponse> {
        let url = self.page_url(endpoint, page);
        debug!("GET {}", url);

        let resp = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    endpoint: endpoint.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                Error::Http(format_reqwest_error(&e))
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                message: summarize_response_body(&body),
            });
        }

        let body = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    endpoint: endpoint.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                Error::Http(format_reqwest_error(&e))
            }
        })?;

        Ok(serde_json::from_slice(&body)?)
    }

    /// `content` of one follow-up page; odd shapes count as empty.
    async fn page_content(&self, endpoint: &str, page: u32) -> Result<Vec<Value>> {
        match self.get_page(endpoint, page).await? {
            PageResponse::Paged(p) => Ok(p.content),
            PageResponse::Flat(items) => Ok(items),
            PageResponse::Unrecognized(_) => {
                warn!("{} page {}: unrecognized payload, treating as empty", endpoint, page);
                Ok(Vec::new())
            }
        }
    }

    /// Fetch every record behind `endpoint`, following pagination.
    ///
    /// Pages after the first are requested concurrently and concatenated in
    /// page order, so the result order is stable for stable backend paging.
    pub async fn fetch_all(&self, endpoint: &str) -> Result<Vec<Value>> {
        let first = self.get_page(endpoint, 0).await?;

        let first = match first {
            PageResponse::Flat(items) => {
                debug!("{}: flat response with {} records", endpoint, items.len());
                return Ok(items);
            }
            PageResponse::Unrecognized(_) => {
                warn!("{}: unrecognized payload, treating as empty", endpoint);
                return Ok(Vec::new());
            }
            PageResponse::Paged(page) => page,
        };

        let total_pages = first.total_pages();
        let mut all = first.content;

        if total_pages > 1 {
            let rest = try_join_all(
                (1..total_pages).map(|page| self.page_content(endpoint, page)),
            )
            .await?;
            for content in rest {
                all.extend(content);
            }
        }

        debug!(
            "{}: {} records across {} page(s)",
            endpoint,
            all.len(),
            total_pages.max(1)
        );

        Ok(all)
    }

    /// Like [`fetch_all`](Self::fetch_all), decoding each record as `T`.
    pub async fn fetch_all_as<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>> {
        let raw = self.fetch_all(endpoint).await?;
        raw.into_iter()
            .map(|v| serde_json::from_value(v).map_err(Error::from))
            .collect()
    }
}

impl EntitySource for ApiClient {
    fn fetch_all(&self, endpoint: &str) -> impl Future<Output = Result<Vec<Value>>> + Send {
        ApiClient::fetch_all(self, endpoint)
    }
}
