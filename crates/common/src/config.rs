//! Dashboard configuration types.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Backend REST API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Entity cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Base path for static deployments. Carried through for consumers
    /// that build links; the pipeline itself never reads it.
    #[serde(default)]
    pub basename: String,
}

/// Backend REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Page size hint sent with the first request of every list fetch.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Entity cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Age after which a cached entity list is refetched on next access.
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_timeout() -> u64 {
    30
}

fn default_page_size() -> u32 {
    1000
}

fn default_user_agent() -> String {
    concat!("spacecap/", env!("CARGO_PKG_VERSION")).into()
}

fn default_ttl() -> u64 {
    300
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            page_size: default_page_size(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
        }
    }
}
