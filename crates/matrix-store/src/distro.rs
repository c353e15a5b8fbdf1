//! Matrix rows and their distro identifiers.

use serde::{Deserialize, Serialize};

/// Distro identifier of the form `{family}-{version}`, e.g. `ubuntu-22.04`.
///
/// The family ends at the first hyphen; the version may itself contain
/// hyphens. An identifier without a hyphen (`arch`) is all family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistroId(String);

impl DistroId {
    pub fn new(id: impl Into<String>) -> Self {
        DistroId(id.into())
    }

    /// Build `{family}-{version}`.
    pub fn from_parts(family: &str, version: &str) -> Self {
        DistroId(format!("{family}-{version}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn family(&self) -> &str {
        self.split().0
    }

    /// Empty when the identifier carries no version.
    pub fn version(&self) -> &str {
        self.split().1
    }

    /// `(family, version)`, split on the first hyphen.
    pub fn split(&self) -> (&str, &str) {
        self.0.split_once('-').unwrap_or((&self.0, ""))
    }

    /// Whether this identifier is `{family}-...`.
    pub fn is_family(&self, family: &str) -> bool {
        self.0
            .strip_prefix(family)
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// Ignored when equal to an ignored name or belonging to an ignored family.
    pub fn is_ignored(&self, ignored: &[String]) -> bool {
        ignored
            .iter()
            .any(|name| self.0 == *name || self.is_family(name))
    }
}

impl std::fmt::Display for DistroId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DistroId {
    fn from(s: &str) -> Self {
        DistroId(s.to_string())
    }
}

/// One row of the test matrix.
///
/// Only `distro` is mandatory when reading; the other fields default to
/// empty so unusual hand-written rows (e.g. ignored ones) still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub distro: DistroId,
    /// Container image, e.g. `jrei/systemd-ubuntu:22.04`
    #[serde(default)]
    pub image: String,
    /// Shell script run once per job before installing
    #[serde(default)]
    pub setup: String,
    /// Install command prefix, e.g. `apt-get install -y`
    #[serde(default)]
    pub installer: String,
    /// Command asserting the package got installed
    #[serde(default)]
    pub verify_package: String,
}

impl MatrixEntry {
    /// Value of one of the five known keys.
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            "distro" => Some(self.distro.as_str()),
            "image" => Some(&self.image),
            "setup" => Some(&self.setup),
            "installer" => Some(&self.installer),
            "verify_package" => Some(&self.verify_package),
            _ => None,
        }
    }

    /// Keys in the order a fresh row is written.
    pub const KEYS: [&'static str; 5] = ["distro", "image", "setup", "installer", "verify_package"];
}
