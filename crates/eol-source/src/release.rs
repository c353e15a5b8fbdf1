//! Release records and the endoflife.date v1 product body.

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::Result;

/// One release of a distro family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Release name as published upstream, e.g. `24.04` or `12`
    pub name: String,
    /// Whether the release has reached end-of-life
    pub is_eol: bool,
}

impl Release {
    pub fn new(name: impl Into<String>, is_eol: bool) -> Self {
        Self {
            name: name.into(),
            is_eol,
        }
    }

    /// Still supported upstream.
    pub fn is_supported(&self) -> bool {
        !self.is_eol
    }
}

/// `GET /products/{family}` response envelope
#[derive(Debug, Deserialize)]
struct ProductResponse {
    result: ProductResult,
}

#[derive(Debug, Deserialize)]
struct ProductResult {
    releases: Vec<WireRelease>,
}

#[derive(Debug, Deserialize)]
struct WireRelease {
    name: String,
    /// Only an explicit `false` marks a release as supported.
    #[serde(rename = "isEol", default)]
    is_eol: Option<bool>,
}

/// Decode a product body into releases, keeping upstream order.
pub fn parse_product_body(family: &str, body: &[u8]) -> Result<Vec<Release>> {
    let response: ProductResponse =
        serde_json::from_slice(body).map_err(|e| SourceError::Decode {
            family: family.to_string(),
            message: e.to_string(),
        })?;

    Ok(response
        .result
        .releases
        .into_iter()
        .map(|r| Release {
            name: r.name,
            is_eol: r.is_eol != Some(false),
        })
        .collect())
}
