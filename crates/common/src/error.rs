//! Unified error type for the capability pipeline.
//!
//! Every variant carries owned strings so a single fetch failure can be
//! handed to all callers waiting on the same in-flight request.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Request to {endpoint} timed out after {secs}s")]
    Timeout { endpoint: String, secs: u64 },

    #[error("API error (status={status}) for {endpoint}: {message}")]
    Api {
        status: u16,
        endpoint: String,
        message: String,
    },

    #[error("JSON parse error: {0}")]
    Json(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Country not found: {0}")]
    CountryNotFound(String),

    #[error("Cannot compare {0} with itself")]
    SelfComparison(String),

    #[error("Async runtime unavailable: {0}")]
    Runtime(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for transport-level failures, where pointing the user at the
    /// configured API base URL helps diagnosis.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Timeout { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}
