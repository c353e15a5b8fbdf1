//! Diff-and-patch over the ordered matrix entries.

use eol_source::ReleaseSource;
use matrix_store::{DistroId, MatrixDocument, MatrixEntry};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::supported::{fetch_supported, FamilyFailure, SupportedSet};
use crate::template::DistroTemplate;

/// A supported identifier that could not be added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAddition {
    pub distro: DistroId,
    pub reason: String,
}

/// Result of diffing entries against a supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Patched entries, in document order
    pub entries: Vec<MatrixEntry>,
    /// Inserted identifiers, in source order
    pub added: Vec<DistroId>,
    /// Dropped identifiers, in document order
    pub removed: Vec<DistroId>,
    pub skipped: Vec<SkippedAddition>,
}

impl Reconciliation {
    pub fn changed(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty())
    }
}

/// Patch `entries` so the families in `supported` match it exactly.
///
/// Only families `supported` covers are touched, and ignored identifiers
/// are never added or removed. Rows of a family that was never queried
/// stay as written, whatever their release state. Removals happen first. Each addition is
/// cloned from the family's first row in `entries` as given, so a family
/// whose rows were all removed can still gain new ones.
pub fn reconcile(
    entries: &[MatrixEntry],
    supported: &SupportedSet,
    ignored: &[String],
) -> Reconciliation {
    let removed: Vec<DistroId> = entries
        .iter()
        .map(|e| &e.distro)
        .filter(|id| !id.is_ignored(ignored))
        .filter(|id| supported.covers(id.family()) && !supported.contains(id))
        .cloned()
        .collect();

    let to_add: Vec<&DistroId> = supported
        .ids()
        .iter()
        .filter(|id| !id.is_ignored(ignored))
        .filter(|id| !entries.iter().any(|e| e.distro == **id))
        .collect();

    let mut patched: Vec<MatrixEntry> = entries
        .iter()
        .filter(|e| !removed.contains(&e.distro))
        .cloned()
        .collect();

    let mut added = Vec::new();
    let mut skipped = Vec::new();
    for id in to_add {
        let family = id.family();
        let template = match DistroTemplate::extract(entries, family) {
            Ok(template) => template,
            Err(e) => {
                skipped.push(SkippedAddition {
                    distro: id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let entry = template.instantiate(id);
        match patched.iter().rposition(|e| e.distro.is_family(family)) {
            Some(last) => patched.insert(last + 1, entry),
            None => patched.push(entry),
        }
        added.push(id.clone());
    }

    Reconciliation {
        entries: patched,
        added,
        removed,
        skipped,
    }
}

/// What a sync run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub added: Vec<DistroId>,
    pub removed: Vec<DistroId>,
    pub skipped: Vec<SkippedAddition>,
    pub failed_families: Vec<FamilyFailure>,
    /// The workflow file was rewritten
    pub written: bool,
    pub dry_run: bool,
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty())
    }
}

/// One sync run over a release source and a workflow file.
pub struct Reconciler<'a, S: ReleaseSource + ?Sized> {
    source: &'a S,
    config: &'a SyncConfig,
    dry_run: bool,
}

impl<'a, S: ReleaseSource + ?Sized> Reconciler<'a, S> {
    pub fn new(source: &'a S, config: &'a SyncConfig) -> Self {
        Reconciler {
            source,
            config,
            dry_run: false,
        }
    }

    /// Compute and report the diff without writing the file.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Fetch, load, reconcile, and save when something changed.
    ///
    /// Source and template failures are recorded in the outcome; only
    /// loading or saving the workflow file fails the run.
    pub async fn run(&self) -> Result<ReconcileOutcome> {
        let supported = fetch_supported(self.source, &self.config.families).await;

        let document =
            MatrixDocument::load(&self.config.workflow_path, &self.config.matrix_path())?
                .with_chomp_fixup(self.config.chomp_fixup());

        let untracked: Vec<&str> = document
            .entries()
            .iter()
            .map(|e| &e.distro)
            .filter(|id| !id.is_ignored(&self.config.ignored))
            .filter(|id| !self.config.families.iter().any(|f| id.is_family(f)))
            .map(DistroId::as_str)
            .collect();
        if !untracked.is_empty() {
            info!(distros = ?untracked, "Leaving rows of unqueried families as written");
        }

        let result = reconcile(document.entries(), &supported, &self.config.ignored);

        for id in &result.removed {
            info!("The {id} distro is not supported, removing from the matrix.");
        }
        for skip in &result.skipped {
            warn!(distro = %skip.distro, reason = %skip.reason, "Skipping new distro");
        }
        for id in &result.added {
            info!("Adding new distro version: {id} to the matrix.");
        }

        let mut written = false;
        if !result.changed() {
            info!("Supported distros are up to date.");
        } else if self.dry_run {
            info!(
                path = %document.path().display(),
                added = result.added.len(),
                removed = result.removed.len(),
                "Dry run, leaving workflow file unchanged"
            );
        } else {
            document.save(&result.entries)?;
            written = true;
            info!(path = %document.path().display(), "Updated workflow file");
        }

        Ok(ReconcileOutcome {
            added: result.added,
            removed: result.removed,
            skipped: result.skipped,
            failed_families: supported.failures().to_vec(),
            written,
            dry_run: self.dry_run,
        })
    }
}
