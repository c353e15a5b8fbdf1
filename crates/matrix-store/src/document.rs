//! The workflow file as an editable document.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::distro::{DistroId, MatrixEntry};
use crate::error::StoreError;
use crate::layout::{dedent, locate_sequence, SequenceLayout};
use crate::style::{line_ending_of, ChompFixup, EntryStyle};
use crate::Result;

/// Workflow file, relative to the repository root
pub const DEFAULT_WORKFLOW_PATH: &str = ".github/workflows/distro.yml";

/// Job holding the distro matrix
pub const DEFAULT_JOB: &str = "distro-tests";

/// Mapping path from the document root to the matrix sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixPath {
    segments: Vec<String>,
}

impl MatrixPath {
    /// `jobs.<job>.strategy.matrix.include`
    pub fn for_job(job: &str) -> Self {
        MatrixPath {
            segments: ["jobs", job, "strategy", "matrix", "include"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn segments(&self) -> Vec<&str> {
        self.segments.iter().map(String::as_str).collect()
    }
}

impl Default for MatrixPath {
    fn default() -> Self {
        Self::for_job(DEFAULT_JOB)
    }
}

impl std::fmt::Display for MatrixPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// A loaded workflow file with its matrix entries mapped to source text.
///
/// The document is a snapshot: `save` writes a new file derived from the
/// snapshot's text and refuses if the file changed on disk meanwhile.
#[derive(Debug, Clone)]
pub struct MatrixDocument {
    path: PathBuf,
    matrix: MatrixPath,
    text: String,
    digest: String,
    layout: SequenceLayout,
    entries: Vec<MatrixEntry>,
    fixup: ChompFixup,
}

impl MatrixDocument {
    /// Read and validate the workflow file at `path`.
    pub fn load(path: &Path, matrix: &MatrixPath) -> Result<Self> {
        let text =
            fs::read_to_string(path).map_err(|e| StoreError::unreadable(path, e.to_string()))?;
        let doc = Self::parse(path, text, matrix)?;
        debug!(
            path = %path.display(),
            entries = doc.entries.len(),
            digest = %&doc.digest[..12],
            "Loaded matrix"
        );
        Ok(doc)
    }

    /// Validate `text` as the content of `path`.
    pub fn parse(path: &Path, text: String, matrix: &MatrixPath) -> Result<Self> {
        let root: Value =
            serde_yaml::from_str(&text).map_err(|e| StoreError::unreadable(path, e.to_string()))?;

        let segments = matrix.segments();
        let mut node = &root;
        for (depth, segment) in segments.iter().enumerate() {
            node = node.get(*segment).ok_or_else(|| {
                let parent = if depth == 0 {
                    "document root".to_string()
                } else {
                    segments[..depth].join(".")
                };
                StoreError::unreadable(path, format!("missing key `{segment}` under {parent}"))
            })?;
        }
        if !node.is_sequence() {
            return Err(StoreError::unreadable(path, format!("{matrix} is not a list")));
        }

        let entries: Vec<MatrixEntry> = serde_yaml::from_value(node.clone())
            .map_err(|e| StoreError::unreadable(path, format!("invalid entry in {matrix}: {e}")))?;

        let mut seen = HashSet::new();
        if let Some(dup) = entries.iter().find(|e| !seen.insert(&e.distro)) {
            return Err(StoreError::unreadable(
                path,
                format!("duplicate matrix entry `{}`", dup.distro),
            ));
        }

        let layout = locate_sequence(&text, &segments)
            .map_err(|e| StoreError::unreadable(path, e.to_string()))?;
        if layout.items.len() != entries.len() {
            return Err(StoreError::unreadable(
                path,
                format!(
                    "found {} entries in text but {} in parsed {matrix}",
                    layout.items.len(),
                    entries.len()
                ),
            ));
        }

        // Every item's text must read back as the entry at the same index.
        for (range, entry) in layout.items.iter().zip(&entries) {
            let item = dedent(&text[range.clone()], layout.dash_indent);
            let parsed: Vec<MatrixEntry> = serde_yaml::from_str(&item).map_err(|e| {
                let reason = format!("entry `{}` is not self-contained: {e}", entry.distro);
                StoreError::unreadable(path, reason)
            })?;
            if parsed.as_slice() != std::slice::from_ref(entry) {
                return Err(StoreError::unreadable(
                    path,
                    format!("entry `{}` could not be mapped to its source text", entry.distro),
                ));
            }
        }

        let digest = content_digest(text.as_bytes());
        Ok(MatrixDocument {
            path: path.to_path_buf(),
            matrix: matrix.clone(),
            text,
            digest,
            layout,
            entries,
            fixup: ChompFixup::default(),
        })
    }

    /// Use `fixup` for rendered entries instead of the default keys.
    pub fn with_chomp_fixup(mut self, fixup: ChompFixup) -> Self {
        self.fixup = fixup;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries in document order, ignored ones included.
    pub fn entries(&self) -> &[MatrixEntry] {
        &self.entries
    }

    /// Identifiers taking part in reconciliation, in document order.
    pub fn current(&self, ignored: &[String]) -> Vec<DistroId> {
        self.entries
            .iter()
            .map(|e| e.distro.clone())
            .filter(|id| !id.is_ignored(ignored))
            .collect()
    }

    /// Exact source text of the entry for `id`.
    pub fn item_text(&self, id: &DistroId) -> Option<&str> {
        self.index_of(id).map(|i| &self.text[self.layout.items[i].clone()])
    }

    fn index_of(&self, id: &DistroId) -> Option<usize> {
        self.entries.iter().position(|e| e.distro == *id)
    }

    /// Style for a new entry: its family's first row, else the first row.
    fn style_for(&self, entry: &MatrixEntry) -> EntryStyle {
        let family = entry.distro.family();
        self.entries
            .iter()
            .position(|e| e.distro.is_family(family))
            .or((!self.entries.is_empty()).then_some(0))
            .map(|i| EntryStyle::learn(&self.text[self.layout.items[i].clone()]))
            .unwrap_or_else(|| {
                EntryStyle::default()
                    .with_dash_indent(self.layout.dash_indent)
                    .with_line_ending(line_ending_of(&self.text))
            })
    }

    /// Render a new entry and read it back.
    fn render_new(&self, entry: &MatrixEntry) -> Result<(String, MatrixEntry)> {
        let style = self.style_for(entry);
        let text = self.fixup.apply(&style.render(entry));

        let written: Vec<MatrixEntry> = serde_yaml::from_str(&dedent(&text, style.dash_indent))
            .map_err(|e| {
                let reason = format!("rendered `{}` is invalid: {e}", entry.distro);
                StoreError::write_failed(&self.path, reason)
            })?;
        match written.as_slice() {
            [w] if same_modulo_final_newline(w, entry) => Ok((text, w.clone())),
            _ => Err(StoreError::write_failed(
                &self.path,
                format!("rendered `{}` does not read back as the same entry", entry.distro),
            )),
        }
    }

    /// Document text with the matrix replaced by `entries`, plus the
    /// entries as they will read back.
    fn render_with_expected(&self, entries: &[MatrixEntry]) -> Result<(String, Vec<MatrixEntry>)> {
        let eol = line_ending_of(&self.text);
        let mut body = String::new();
        let mut expected = Vec::with_capacity(entries.len());
        for entry in entries {
            let (text, written) = match self.index_of(&entry.distro) {
                Some(i) if self.entries[i] == *entry => (
                    Cow::Borrowed(&self.text[self.layout.items[i].clone()]),
                    entry.clone(),
                ),
                _ => {
                    let (text, written) = self.render_new(entry)?;
                    (Cow::Owned(text), written)
                }
            };
            if !body.is_empty() && !body.ends_with('\n') {
                body.push_str(eol);
            }
            body.push_str(&text);
            expected.push(written);
        }

        let text = self.text.as_str();
        let layout = &self.layout;
        let mut out = String::with_capacity(text.len() + body.len());
        match (layout.items.is_empty(), body.is_empty()) {
            (true, true) => out.push_str(text),
            // `key: []` becomes `key:` with the rows below it.
            (true, false) => {
                out.push_str(text[..layout.region.start].trim_end_matches(' '));
                let after = &text[layout.region.end..layout.key_line_end];
                let comment = after.trim();
                if !comment.is_empty() {
                    out.push(' ');
                    out.push_str(comment);
                }
                out.push_str(eol);
                out.push_str(&body);
                out.push_str(&text[layout.key_line_end..]);
            }
            // The rows go and `key:` takes `[]` as its value.
            (false, true) => {
                let at = layout.value_at;
                let commented = text[at..layout.key_line_end].starts_with('#');
                out.push_str(&text[..at]);
                out.push_str(if commented { "[] " } else { " []" });
                out.push_str(&text[at..layout.region.start]);
                out.push_str(&text[layout.region.end..]);
            }
            (false, false) => {
                out.push_str(&text[..layout.region.start]);
                out.push_str(&body);
                out.push_str(&text[layout.region.end..]);
            }
        }
        Ok((out, expected))
    }

    /// Document text with the matrix replaced by `entries`.
    ///
    /// Entries present in the snapshot and unchanged keep their exact
    /// source text; everything outside the matrix is untouched.
    pub fn render(&self, entries: &[MatrixEntry]) -> Result<String> {
        self.render_with_expected(entries).map(|(text, _)| text)
    }

    /// Write the document with the matrix replaced by `entries`.
    ///
    /// The new text is re-validated before writing, and the write is an
    /// atomic rename, so a failure leaves the file as it was.
    pub fn save(&self, entries: &[MatrixEntry]) -> Result<()> {
        let (rendered, expected) = self.render_with_expected(entries)?;

        let check = Self::parse(&self.path, rendered.clone(), &self.matrix).map_err(|e| {
            let reason = format!("updated document would be unreadable: {e}");
            StoreError::write_failed(&self.path, reason)
        })?;
        if check.entries != expected {
            return Err(StoreError::write_failed(
                &self.path,
                "updated document does not contain the requested entries",
            ));
        }

        let on_disk = fs::read(&self.path)
            .map_err(|e| StoreError::write_failed(&self.path, e.to_string()))?;
        if content_digest(&on_disk) != self.digest {
            return Err(StoreError::write_failed(
                &self.path,
                "file changed on disk since it was loaded",
            ));
        }

        write_atomic(&self.path, rendered.as_bytes())?;
        info!(path = %self.path.display(), entries = entries.len(), "Saved matrix");
        Ok(())
    }
}

fn same_modulo_final_newline(a: &MatrixEntry, b: &MatrixEntry) -> bool {
    a.distro == b.distro
        && a.image == b.image
        && a.setup.trim_end_matches('\n') == b.setup.trim_end_matches('\n')
        && a.installer == b.installer
        && a.verify_package == b.verify_package
}

fn content_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Replace `path` with `bytes` via a temp file in the same directory.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let fail = |e: std::io::Error| StoreError::write_failed(path, e.to_string());
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions()).map_err(fail)?;
    }
    tmp.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}
