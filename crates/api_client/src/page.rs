//! Response shapes of list endpoints.

use serde::Deserialize;
use serde_json::Value;

/// A list endpoint body, classified once right after the HTTP call.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PageResponse {
    /// Plain JSON array of records.
    Flat(Vec<Value>),
    /// Spring-style paginated envelope.
    Paged(Page),
    /// Anything else. Callers treat it as an empty result.
    Unrecognized(Value),
}

/// Paginated envelope: `{content, totalElements, totalPages, size, number}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub content: Vec<Value>,
    #[serde(default)]
    pub total_elements: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub number: Option<u32>,
}

impl Page {
    /// Number of pages, treating a missing count as a single page.
    pub fn total_pages(&self) -> u32 {
        self.total_pages.unwrap_or(1).max(1)
    }
}
