//! Error types for eol-source

use thiserror::Error;

/// Errors that can occur while fetching release data for a family.
///
/// Every variant means the family's support status is unavailable for
/// this run.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport failure (DNS, connect, timeout, TLS)
    #[error("request for {family} failed: {message}")]
    Http { family: String, message: String },

    /// The API answered with a non-success status
    #[error("request for {family} returned HTTP {status}")]
    Status { family: String, status: u16 },

    /// The body was not the expected JSON shape
    #[error("invalid release data for {family}: {message}")]
    Decode { family: String, message: String },

    /// HTTP client could not be constructed
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl SourceError {
    /// Family the failed request was for, if any.
    pub fn family(&self) -> Option<&str> {
        match self {
            SourceError::Http { family, .. }
            | SourceError::Status { family, .. }
            | SourceError::Decode { family, .. } => Some(family),
            SourceError::Client(_) => None,
        }
    }
}
