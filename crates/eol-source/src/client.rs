//! endoflife.date HTTP client
//!
//! Issues `GET {base_url}/products/{family}` and decodes the v1 body.
//! Requests are bounded by a per-request timeout and are never retried.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SourceError;
use crate::release::{parse_product_body, Release};
use crate::{ReleaseSource, Result};

/// Public v1 API root
pub const DEFAULT_BASE_URL: &str = "https://endoflife.date/api/v1";

/// Per-request timeout when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// endoflife.date client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EolConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EolConfig {
    fn default() -> Self {
        let base_url =
            std::env::var("EOL_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        EolConfig::new(&base_url).with_timeout_secs(
            std::env::var("EOL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }
}

impl EolConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific API root
    pub fn new(base_url: &str) -> Self {
        EolConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn product_url(&self, family: &str) -> String {
        format!("{}/products/{}", self.base_url.trim_end_matches('/'), family)
    }
}

/// endoflife.date client
pub struct EndOfLifeClient {
    config: EolConfig,
    http_client: reqwest::Client,
}

impl EndOfLifeClient {
    /// Create a new client
    pub fn new(config: EolConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("distro-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(EndOfLifeClient {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl ReleaseSource for EndOfLifeClient {
    async fn fetch(&self, family: &str) -> Result<Vec<Release>> {
        let url = self.config.product_url(family);
        debug!(%url, "Fetching release data");

        let http_err = |e: reqwest::Error| SourceError::Http {
            family: family.to_string(),
            message: e.to_string(),
        };

        let response = self.http_client.get(&url).send().await.map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                family: family.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(http_err)?;
        let releases = parse_product_body(family, &body)?;
        debug!(family, count = releases.len(), "Decoded releases");
        Ok(releases)
    }
}
