//! distro-sync core
//!
//! Fetches which distro releases are still supported, diffs them against
//! the test matrix, and patches the matrix: end-of-life rows are removed,
//! new releases are cloned from an existing row of the same family.
//!
//! ## Flow
//!
//! 1. [`fetch_supported`] queries the release source family by family
//! 2. [`reconcile`] computes the patched entry list (pure)
//! 3. [`Reconciler`] ties both to a `MatrixDocument` and saves once
//! 4. [`report`] turns the outcome into CI outputs and summaries

pub mod config;
pub mod error;
pub mod reconcile;
pub mod report;
pub mod supported;
pub mod telemetry;
pub mod template;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use reconcile::{reconcile, ReconcileOutcome, Reconciler, Reconciliation, SkippedAddition};
pub use report::{emit_github_outputs, pr_description, render_summary, GithubOutput, JsonReport};
pub use supported::{fetch_supported, FamilyFailure, SupportedSet};
pub use telemetry::{init_tracing, LogFormat};
pub use template::{DistroTemplate, TemplateError, VERSION_PLACEHOLDER};
