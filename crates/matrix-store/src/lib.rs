//! Matrix-Store: the distro test matrix inside a CI workflow file
//!
//! The workflow file is reviewed by humans as a diff, so this crate never
//! re-serializes the whole document. It parses the file to validate its
//! shape, maps every matrix entry back to its exact source text, and on
//! save splices kept entries through verbatim while rendering new ones in
//! the style the file already uses.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: format fidelity and all-or-nothing writes.
//!
//! ## Key Components
//!
//! - `MatrixDocument`: load / inspect / save one workflow file
//! - `MatrixEntry`, `DistroId`: the row type and its key
//! - `EntryStyle`, `ChompFixup`: how new rows are rendered

mod distro;
mod document;
mod error;
mod layout;
pub mod style;

pub use distro::{DistroId, MatrixEntry};
pub use document::{MatrixDocument, MatrixPath, DEFAULT_JOB, DEFAULT_WORKFLOW_PATH};
pub use error::StoreError;
pub use style::{ChompFixup, EntryStyle, ScalarStyle};

/// Result type for matrix-store operations
pub type Result<T> = std::result::Result<T, StoreError>;
