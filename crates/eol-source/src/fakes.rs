//! In-memory fakes for the release source (testing only)
//!
//! Provides `StaticReleaseSource`, which serves canned releases per family
//! and can be told to fail for specific families.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::release::Release;
use crate::{ReleaseSource, Result};

/// Canned release source backed by a `HashMap<family, releases>`.
///
/// Unknown families answer with HTTP 404, matching the real API.
#[derive(Debug, Default)]
pub struct StaticReleaseSource {
    releases: HashMap<String, Vec<Release>>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl StaticReleaseSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register releases for a family as `(name, is_eol)` pairs.
    pub fn with_family(mut self, family: &str, releases: &[(&str, bool)]) -> Self {
        self.releases.insert(
            family.to_string(),
            releases
                .iter()
                .map(|(name, eol)| Release::new(*name, *eol))
                .collect(),
        );
        self
    }

    /// Make every fetch of `family` fail with a 503.
    pub fn failing(mut self, family: &str) -> Self {
        self.failing.insert(family.to_string());
        self
    }

    /// Families fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReleaseSource for StaticReleaseSource {
    async fn fetch(&self, family: &str) -> Result<Vec<Release>> {
        self.calls.lock().unwrap().push(family.to_string());

        if self.failing.contains(family) {
            return Err(SourceError::Status {
                family: family.to_string(),
                status: 503,
            });
        }

        self.releases
            .get(family)
            .cloned()
            .ok_or_else(|| SourceError::Status {
                family: family.to_string(),
                status: 404,
            })
    }
}
