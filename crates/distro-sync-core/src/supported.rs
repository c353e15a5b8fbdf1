//! Building the set of supported distro identifiers.

use std::collections::HashSet;

use eol_source::ReleaseSource;
use matrix_store::DistroId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A family whose release data could not be fetched this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyFailure {
    pub family: String,
    pub error: String,
}

/// Supported identifiers in source order, plus which families answered.
///
/// Reconciliation only touches families in `fetched`; a family that
/// failed contributes nothing and its rows are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedSet {
    ids: Vec<DistroId>,
    fetched: Vec<String>,
    failed: Vec<FamilyFailure>,
}

impl SupportedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a family's supported release names, in upstream order.
    pub fn add_family<I, S>(&mut self, family: &str, supported_names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: HashSet<DistroId> = self.ids.iter().cloned().collect();
        for name in supported_names {
            let id = DistroId::from_parts(family, name.as_ref());
            if seen.insert(id.clone()) {
                self.ids.push(id);
            }
        }
        if !self.fetched.iter().any(|f| f == family) {
            self.fetched.push(family.to_string());
        }
    }

    pub fn add_failure(&mut self, family: &str, error: impl ToString) {
        self.failed.push(FamilyFailure {
            family: family.to_string(),
            error: error.to_string(),
        });
    }

    /// Supported identifiers in source order.
    pub fn ids(&self) -> &[DistroId] {
        &self.ids
    }

    pub fn contains(&self, id: &DistroId) -> bool {
        self.ids.contains(id)
    }

    /// Whether the family's status is known this run.
    pub fn covers(&self, family: &str) -> bool {
        self.fetched.iter().any(|f| f == family)
    }

    pub fn failures(&self) -> &[FamilyFailure] {
        &self.failed
    }
}

/// Query `source` for each family in turn.
///
/// A failing family is logged and skipped; it never aborts the others.
pub async fn fetch_supported<S>(source: &S, families: &[String]) -> SupportedSet
where
    S: ReleaseSource + ?Sized,
{
    let mut supported = SupportedSet::new();

    for family in families {
        match source.fetch(family).await {
            Ok(releases) => {
                for release in &releases {
                    debug!(
                        family = %family,
                        release = %release.name,
                        eol = release.is_eol,
                        "Release"
                    );
                }
                let names: Vec<&str> = releases
                    .iter()
                    .filter(|r| r.is_supported())
                    .map(|r| r.name.as_str())
                    .collect();
                info!(
                    family = %family,
                    supported = names.len(),
                    total = releases.len(),
                    "Fetched releases"
                );
                supported.add_family(family, names);
            }
            Err(e) => {
                warn!(
                    family = %family,
                    error = %e,
                    "Error fetching release data, leaving family untouched"
                );
                supported.add_failure(family, e);
            }
        }
    }

    supported
}

#[cfg(test)]
mod tests {
    use super::*;
    use eol_source::fakes::StaticReleaseSource;

    fn families(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_union_in_source_order() {
        let source = StaticReleaseSource::new()
            .with_family("debian", &[("12", false), ("11", true)])
            .with_family("ubuntu", &[("24.04", false), ("22.04", false), ("20.04", true)]);

        let supported = fetch_supported(&source, &families(&["debian", "ubuntu"])).await;

        let ids: Vec<&str> = supported.ids().iter().map(|i| i.as_str()).collect();
        assert_eq!(ids, vec!["debian-12", "ubuntu-24.04", "ubuntu-22.04"]);
        assert!(supported.covers("debian"));
        assert!(supported.failures().is_empty());
        assert_eq!(source.calls(), vec!["debian", "ubuntu"]);
    }

    #[tokio::test]
    async fn test_failed_family_is_not_covered() {
        let source = StaticReleaseSource::new()
            .with_family("ubuntu", &[("24.04", false)])
            .failing("fedora");

        let supported = fetch_supported(&source, &families(&["fedora", "ubuntu"])).await;

        assert!(!supported.covers("fedora"));
        assert!(supported.covers("ubuntu"));
        assert_eq!(supported.failures().len(), 1);
        assert_eq!(supported.failures()[0].family, "fedora");
        assert!(supported.failures()[0].error.contains("503"));
    }

    #[test]
    fn test_add_family_drops_duplicates() {
        let mut supported = SupportedSet::new();
        supported.add_family("fedora", ["41", "40", "41"]);
        let ids: Vec<&str> = supported.ids().iter().map(|i| i.as_str()).collect();
        assert_eq!(ids, vec!["fedora-41", "fedora-40"]);
    }

    #[test]
    fn test_family_with_no_supported_releases_is_still_covered() {
        let mut supported = SupportedSet::new();
        supported.add_family("fedora", Vec::<String>::new());
        assert!(supported.covers("fedora"));
        assert!(supported.ids().is_empty());
    }
}
