//! Deriving new matrix rows from an existing row of the same family.
//!
//! The workflow file describes itself: to add `ubuntu-24.04`, take the
//! first `ubuntu-*` row, generalize the version in its image into a
//! placeholder, and fill in the new version. A family with no row cannot
//! be synthesized.

use matrix_store::{DistroId, MatrixEntry};
use serde::{Deserialize, Serialize};

/// Marks where the version goes in an image pattern
pub const VERSION_PLACEHOLDER: &str = "{version}";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("no existing `{family}-*` entry to use as a template")]
    NotFound { family: String },

    #[error(
        "version `{version}` of template entry `{source_id}` does not occur in its image `{image}`"
    )]
    VersionNotInImage {
        source_id: DistroId,
        version: String,
        image: String,
    },
}

/// A family's row with the image version generalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroTemplate {
    pub family: String,
    /// Row the template was taken from
    pub source_id: DistroId,
    /// Image text before the version
    image_prefix: String,
    /// Image text after the version
    image_suffix: String,
    pub setup: String,
    pub installer: String,
    pub verify_package: String,
}

impl DistroTemplate {
    /// Build the template for `family` from the first matching row.
    ///
    /// The rightmost occurrence of the row's version in its image is the
    /// one generalized; image tags sit at the end of the reference.
    pub fn extract(entries: &[MatrixEntry], family: &str) -> Result<Self, TemplateError> {
        let entry = entries
            .iter()
            .find(|e| e.distro.is_family(family))
            .ok_or_else(|| TemplateError::NotFound {
                family: family.to_string(),
            })?;

        let version = entry.distro.version();
        let position = (!version.is_empty())
            .then(|| entry.image.rfind(version))
            .flatten()
            .ok_or_else(|| TemplateError::VersionNotInImage {
                source_id: entry.distro.clone(),
                version: version.to_string(),
                image: entry.image.clone(),
            })?;

        Ok(DistroTemplate {
            family: family.to_string(),
            source_id: entry.distro.clone(),
            image_prefix: entry.image[..position].to_string(),
            image_suffix: entry.image[position + version.len()..].to_string(),
            setup: entry.setup.clone(),
            installer: entry.installer.clone(),
            verify_package: entry.verify_package.clone(),
        })
    }

    /// Image reference with the placeholder, e.g. `jrei/systemd-ubuntu:{version}`.
    pub fn image_pattern(&self) -> String {
        format!("{}{VERSION_PLACEHOLDER}{}", self.image_prefix, self.image_suffix)
    }

    pub fn image_for(&self, version: &str) -> String {
        format!("{}{version}{}", self.image_prefix, self.image_suffix)
    }

    /// A new row for `id`; `id` should belong to this template's family.
    pub fn instantiate(&self, id: &DistroId) -> MatrixEntry {
        MatrixEntry {
            distro: id.clone(),
            image: self.image_for(id.version()),
            setup: self.setup.clone(),
            installer: self.installer.clone(),
            verify_package: self.verify_package.clone(),
        }
    }
}
