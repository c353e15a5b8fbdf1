//! Error types for matrix-store

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur reading or writing the workflow file.
///
/// Both are fatal for a run: nothing is mutated after `Unreadable`, and
/// `WriteFailed` leaves the file on disk as it was.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Missing file, invalid YAML, or not the expected matrix shape
    #[error("cannot read matrix from {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    /// The updated document could not be persisted
    #[error("cannot write matrix to {}: {reason}", path.display())]
    WriteFailed { path: PathBuf, reason: String },
}

impl StoreError {
    pub(crate) fn unreadable(path: &std::path::Path, reason: impl Into<String>) -> Self {
        StoreError::Unreadable {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn write_failed(path: &std::path::Path, reason: impl Into<String>) -> Self {
        StoreError::WriteFailed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
