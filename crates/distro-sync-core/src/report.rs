//! Surfacing a run's outcome to CI and to the terminal.
//!
//! - GitHub Actions step outputs (`changes_made`, `pr_description`)
//! - a plain-text or JSON summary for stdout

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::reconcile::ReconcileOutcome;

const PR_HEADER: &str =
    "Update supported Linux distribution versions based on https://endoflife.date/\n\n";

/// Pull request body listing what changed.
pub fn pr_description(outcome: &ReconcileOutcome) -> String {
    let mut body = PR_HEADER.to_string();

    if !outcome.added.is_empty() {
        body.push_str("### Added distros:\n");
        for id in &outcome.added {
            body.push_str(&format!("- {id}\n"));
        }
        body.push('\n');
    }

    if !outcome.removed.is_empty() {
        body.push_str("### Removed distros (reached end-of-life):\n");
        for id in &outcome.removed {
            body.push_str(&format!("- {id}\n"));
        }
        body.push('\n');
    }

    body.trim_end().to_string()
}

/// The `$GITHUB_OUTPUT` step output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubOutput {
    path: PathBuf,
}

impl GithubOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        GithubOutput { path: path.into() }
    }

    /// `None` outside GitHub Actions (variable unset or empty).
    pub fn from_env() -> Option<Self> {
        std::env::var_os("GITHUB_OUTPUT")
            .filter(|v| !v.is_empty())
            .map(Self::new)
    }

    /// Append `name=value`; multi-line values use a random heredoc delimiter.
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let line = if value.contains('\n') {
            let delimiter = format!("EOF_{}", Uuid::new_v4().simple());
            format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
        } else {
            format!("{name}={value}\n")
        };

        let output_error = |source| SyncError::Output {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(output_error)?;
        file.write_all(line.as_bytes()).map_err(output_error)?;

        debug!(output = name, path = %self.path.display(), "Set step output");
        Ok(())
    }
}

/// Emit `changes_made`, plus `pr_description` when something changed.
///
/// Without an output file this is a no-op.
pub fn emit_github_outputs(
    outcome: &ReconcileOutcome,
    output: Option<&GithubOutput>,
) -> Result<()> {
    let Some(output) = output else {
        return Ok(());
    };

    if outcome.changed() {
        output.set("changes_made", "true")?;
        output.set("pr_description", &pr_description(outcome))?;
    } else {
        output.set("changes_made", "false")?;
    }
    Ok(())
}

/// Human-readable run summary.
pub fn render_summary(outcome: &ReconcileOutcome) -> String {
    let mut out = String::new();

    if !outcome.changed() {
        out.push_str("Supported distros are up to date.\n");
    } else {
        let verb = if outcome.written {
            "Updated"
        } else if outcome.dry_run {
            "Would update"
        } else {
            "Changes pending for"
        };
        out.push_str(&format!(
            "{verb} matrix: {} added, {} removed\n",
            outcome.added.len(),
            outcome.removed.len()
        ));
        for id in &outcome.added {
            out.push_str(&format!("  + {id}\n"));
        }
        for id in &outcome.removed {
            out.push_str(&format!("  - {id}\n"));
        }
    }

    for skip in &outcome.skipped {
        out.push_str(&format!("Skipped {}: {}\n", skip.distro, skip.reason));
    }
    for failure in &outcome.failed_families {
        out.push_str(&format!(
            "Could not fetch {} (left untouched): {}\n",
            failure.family, failure.error
        ));
    }
    out
}

/// Machine-readable run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonReport {
    pub generated_at: DateTime<Utc>,
    pub changed: bool,
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
    /// Present when something changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_description: Option<String>,
}

impl JsonReport {
    pub fn new(outcome: ReconcileOutcome) -> Self {
        let changed = outcome.changed();
        let pr_description = changed.then(|| pr_description(&outcome));
        JsonReport {
            generated_at: Utc::now(),
            changed,
            outcome,
            pr_description,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
