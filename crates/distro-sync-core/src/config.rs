//! Run configuration.

use std::path::PathBuf;

use eol_source::{EolConfig, DEFAULT_BASE_URL};
use matrix_store::{ChompFixup, MatrixPath, DEFAULT_JOB, DEFAULT_WORKFLOW_PATH};
use serde::{Deserialize, Serialize};

/// Families queried upstream unless configured otherwise
pub const DEFAULT_FAMILIES: [&str; 3] = ["debian", "ubuntu", "fedora"];

/// Rows never added or removed (no versioned EOL upstream)
pub const DEFAULT_IGNORED: [&str; 1] = ["arch"];

/// Everything one sync run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Workflow file holding the matrix
    pub workflow_path: PathBuf,
    /// Job whose `strategy.matrix.include` is the matrix
    pub job: String,
    /// Families fetched from the release source, in order
    pub families: Vec<String>,
    /// Names or families excluded from reconciliation
    pub ignored: Vec<String>,
    /// Release source settings
    pub eol: EolConfig,
    /// Keys whose rendered block scalars use clip chomping
    pub clip_keys: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            workflow_path: PathBuf::from(DEFAULT_WORKFLOW_PATH),
            job: DEFAULT_JOB.to_string(),
            families: DEFAULT_FAMILIES.iter().map(|s| s.to_string()).collect(),
            ignored: DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect(),
            eol: EolConfig::new(DEFAULT_BASE_URL),
            clip_keys: ChompFixup::DEFAULT_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SyncConfig {
    /// Defaults overridden by `DISTRO_SYNC_*` and `EOL_*` environment variables.
    ///
    /// List variables are comma separated; an empty value yields an empty list.
    pub fn from_env() -> Self {
        let mut config = SyncConfig {
            eol: EolConfig::from_env(),
            ..Self::default()
        };
        if let Ok(path) = std::env::var("DISTRO_SYNC_WORKFLOW") {
            config.workflow_path = PathBuf::from(path);
        }
        if let Ok(job) = std::env::var("DISTRO_SYNC_JOB") {
            config.job = job;
        }
        if let Ok(families) = std::env::var("DISTRO_SYNC_FAMILIES") {
            config.families = split_list(&families);
        }
        if let Ok(ignored) = std::env::var("DISTRO_SYNC_IGNORE") {
            config.ignored = split_list(&ignored);
        }
        config
    }

    /// Defaults, pointed at a specific workflow file.
    pub fn for_workflow(path: impl Into<PathBuf>) -> Self {
        SyncConfig {
            workflow_path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_families(mut self, families: &[&str]) -> Self {
        self.families = families.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_ignored(mut self, ignored: &[&str]) -> Self {
        self.ignored = ignored.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn matrix_path(&self) -> MatrixPath {
        MatrixPath::for_job(&self.job)
    }

    pub fn chomp_fixup(&self) -> ChompFixup {
        ChompFixup::new(&self.clip_keys)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.workflow_path, PathBuf::from(".github/workflows/distro.yml"));
        assert_eq!(config.families, vec!["debian", "ubuntu", "fedora"]);
        assert_eq!(config.ignored, vec!["arch"]);
        assert_eq!(config.clip_keys, vec!["setup", "run"]);
        assert_eq!(
            config.matrix_path().to_string(),
            "jobs.distro-tests.strategy.matrix.include"
        );
    }

    #[test]
    fn test_builders() {
        let config = SyncConfig::for_workflow("ci/distro.yml")
            .with_families(&["ubuntu"])
            .with_ignored(&[]);
        assert_eq!(config.workflow_path, PathBuf::from("ci/distro.yml"));
        assert_eq!(config.families, vec!["ubuntu"]);
        assert!(config.ignored.is_empty());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("debian, ubuntu,,fedora "), vec!["debian", "ubuntu", "fedora"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = SyncConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: SyncConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
