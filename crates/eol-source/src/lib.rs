//! EOL-Source: release support status for distro-sync
//!
//! This crate answers one question per distro family: which releases are
//! still supported? The production backend is the endoflife.date API;
//! an in-memory fake lives in [`fakes`] for tests.
//!
//! ## Layer 0 - Remote Data
//!
//! Focus: one request per family, failures reported per family so the
//! caller can skip and continue.

mod client;
mod error;
pub mod fakes;
mod release;

pub use client::{EndOfLifeClient, EolConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use error::SourceError;
pub use release::{parse_product_body, Release};

use async_trait::async_trait;

/// Result type for eol-source operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// A source of per-family release support status.
///
/// Implementations return releases in the order the upstream lists them;
/// callers rely on that order when inserting new matrix entries.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch every known release of `family` with its end-of-life flag.
    async fn fetch(&self, family: &str) -> Result<Vec<Release>>;
}
