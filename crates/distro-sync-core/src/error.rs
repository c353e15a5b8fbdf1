//! Run-level error taxonomy.
//!
//! Only document and output failures surface here; per-family source
//! failures and per-identifier template failures are recorded in the
//! outcome.

use std::path::PathBuf;

use matrix_store::StoreError;

/// Fatal errors that abort a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to write CI output file {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
