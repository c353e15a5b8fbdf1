//! End-to-end sync runs against a canned release source and a scratch
//! workflow file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use distro_sync_core::{
    emit_github_outputs, fetch_supported, GithubOutput, ReconcileOutcome, Reconciler, SyncConfig,
    SyncError,
};
use eol_source::fakes::StaticReleaseSource;
use matrix_store::{DistroId, MatrixDocument, MatrixPath, StoreError};
use tempfile::TempDir;

const WORKFLOW: &str = include_str!("fixtures/distro.yml");

const UBUNTU_20_04: &str = "          - distro: ubuntu-20.04
            image: \"jrei/systemd-ubuntu:20.04\"
            setup: |
              apt-get update
              apt-get upgrade -y
            installer: \"apt-get install -y\"
            verify_package: \"dpkg -l paretosecurity\"
";

const UBUNTU_24_04: &str = "          - distro: ubuntu-24.04
            image: \"jrei/systemd-ubuntu:24.04\"
            setup: |
              apt-get update
              apt-get upgrade -y
            installer: \"apt-get install -y\"
            verify_package: \"dpkg -l paretosecurity\"
";

fn scratch() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("distro.yml");
    fs::write(&path, WORKFLOW).unwrap();
    (dir, path)
}

fn config(path: &Path, families: &[&str]) -> SyncConfig {
    SyncConfig::for_workflow(path).with_families(families)
}

fn load(path: &Path) -> MatrixDocument {
    MatrixDocument::load(path, &MatrixPath::default()).expect("load")
}

fn distros(path: &Path) -> Vec<String> {
    load(path)
        .entries()
        .iter()
        .map(|e| e.distro.to_string())
        .collect()
}

fn ids(list: &[DistroId]) -> Vec<&str> {
    list.iter().map(|i| i.as_str()).collect()
}

/// debian and ubuntu as upstream reports them at the time of writing.
fn upstream() -> StaticReleaseSource {
    StaticReleaseSource::new()
        .with_family("debian", &[("12", false), ("11", false), ("10", true)])
        .with_family(
            "ubuntu",
            &[("24.04", false), ("22.04", false), ("20.04", true)],
        )
}

#[tokio::test]
async fn replaces_eol_release_with_new_one_in_place() {
    let (_dir, path) = scratch();
    let source = upstream();
    let config = config(&path, &["ubuntu"]);

    let outcome = Reconciler::new(&source, &config).run().await.unwrap();

    assert_eq!(ids(&outcome.removed), vec!["ubuntu-20.04"]);
    assert_eq!(ids(&outcome.added), vec!["ubuntu-24.04"]);
    assert!(outcome.written);
    assert!(outcome.changed());

    let expected = WORKFLOW.replace(UBUNTU_20_04, "").replace(
        "          - distro: fedora-40",
        &format!("{UBUNTU_24_04}          - distro: fedora-40"),
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), expected);
}

#[tokio::test]
async fn failing_family_is_left_untouched() {
    let (_dir, path) = scratch();
    let source = upstream()
        .with_family("debian", &[("13", false), ("12", false), ("11", true)])
        .failing("fedora");
    let config = config(&path, &["debian", "ubuntu", "fedora"]);

    let outcome = Reconciler::new(&source, &config).run().await.unwrap();

    assert_eq!(ids(&outcome.removed), vec!["debian-11", "ubuntu-20.04"]);
    assert_eq!(ids(&outcome.added), vec!["debian-13", "ubuntu-24.04"]);
    assert_eq!(outcome.failed_families.len(), 1);
    assert_eq!(outcome.failed_families[0].family, "fedora");

    assert_eq!(
        distros(&path),
        vec![
            "debian-12",
            "debian-13",
            "ubuntu-22.04",
            "ubuntu-24.04",
            "fedora-40",
            "arch",
            "arch-rolling"
        ]
    );
}

#[tokio::test]
async fn ignored_rows_are_never_reported_or_touched() {
    let (_dir, path) = scratch();
    let source = upstream().with_family("arch", &[("2024.10.01", false)]);
    let config = config(&path, &["debian", "arch"]);

    let outcome = Reconciler::new(&source, &config).run().await.unwrap();

    assert!(!outcome.changed());
    assert!(!outcome.written);
    assert!(outcome.skipped.is_empty());
    assert_eq!(fs::read_to_string(&path).unwrap(), WORKFLOW);
}

#[tokio::test]
async fn family_without_rows_is_skipped() {
    let (_dir, path) = scratch();
    let source = StaticReleaseSource::new().with_family("rocky", &[("9", false), ("8", false)]);
    let config = config(&path, &["rocky"]);

    let outcome = Reconciler::new(&source, &config).run().await.unwrap();

    assert!(outcome.added.is_empty());
    assert_eq!(
        outcome
            .skipped
            .iter()
            .map(|s| s.distro.as_str())
            .collect::<Vec<_>>(),
        vec!["rocky-9", "rocky-8"]
    );
    assert!(!outcome.written);
    assert_eq!(fs::read_to_string(&path).unwrap(), WORKFLOW);
}

#[tokio::test]
async fn second_run_changes_nothing() {
    let (_dir, path) = scratch();
    let source = upstream();
    let config = config(&path, &["debian", "ubuntu"]);

    let first = Reconciler::new(&source, &config).run().await.unwrap();
    assert!(first.changed());
    let after_first = fs::read_to_string(&path).unwrap();

    let second = Reconciler::new(&source, &config).run().await.unwrap();
    assert_eq!(second, ReconcileOutcome::default());
    assert_eq!(fs::read_to_string(&path).unwrap(), after_first);
}

#[tokio::test]
async fn fetched_families_match_upstream_afterwards() {
    let (_dir, path) = scratch();
    let source = upstream().with_family("fedora", &[("42", false), ("41", false), ("40", true)]);
    let config = config(&path, &["debian", "ubuntu", "fedora"]);

    Reconciler::new(&source, &config).run().await.unwrap();

    let supported = fetch_supported(&source, &config.families).await;
    let want: HashSet<&DistroId> = supported.ids().iter().collect();
    let current = load(&path).current(&config.ignored);
    let have: HashSet<&DistroId> = current.iter().collect();
    assert_eq!(have, want);
}

#[tokio::test]
async fn kept_rows_and_surroundings_are_byte_identical() {
    let (_dir, path) = scratch();
    let before = load(&path);
    let source = upstream().with_family("fedora", &[("41", false), ("40", false)]);
    let config = config(&path, &["debian", "ubuntu", "fedora"]);

    let outcome = Reconciler::new(&source, &config).run().await.unwrap();
    let written = fs::read_to_string(&path).unwrap();

    for entry in before.entries() {
        if outcome.removed.contains(&entry.distro) {
            continue;
        }
        let text = before.item_text(&entry.distro).unwrap();
        assert!(written.contains(text), "{} was rewritten", entry.distro);
    }

    let head = &WORKFLOW[..WORKFLOW.find("          - distro: debian-11").unwrap()];
    let tail = &WORKFLOW[WORKFLOW.find("    container:").unwrap()..];
    assert!(written.starts_with(head));
    assert!(written.ends_with(tail));
}

#[tokio::test]
async fn new_rows_follow_their_family_and_template() {
    let (_dir, path) = scratch();
    let source = StaticReleaseSource::new()
        .with_family("debian", &[("13", false), ("12", false), ("11", false)])
        .with_family("fedora", &[("41", false), ("40", false)]);
    let config = config(&path, &["debian", "fedora"]);

    let outcome = Reconciler::new(&source, &config).run().await.unwrap();
    assert_eq!(ids(&outcome.added), vec!["debian-13", "fedora-41"]);

    let doc = load(&path);
    let order: Vec<&str> = doc.entries().iter().map(|e| e.distro.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "debian-11",
            "debian-12",
            "debian-13",
            "ubuntu-20.04",
            "ubuntu-22.04",
            "fedora-40",
            "fedora-41",
            "arch",
            "arch-rolling"
        ]
    );

    let source_row = &doc.entries()[5];
    let new_row = &doc.entries()[6];
    assert_eq!(new_row.image, "jrei/systemd-fedora:41");
    assert_eq!(new_row.setup, source_row.setup);
    assert_eq!(new_row.installer, source_row.installer);
    assert_eq!(new_row.verify_package, source_row.verify_package);
}

#[tokio::test]
async fn fully_replaced_family_is_repopulated() {
    let (_dir, path) = scratch();
    let source = StaticReleaseSource::new()
        .with_family("fedora", &[("42", false), ("41", false), ("40", true)]);
    let config = config(&path, &["fedora"]);

    let outcome = Reconciler::new(&source, &config).run().await.unwrap();

    assert_eq!(ids(&outcome.removed), vec!["fedora-40"]);
    assert_eq!(ids(&outcome.added), vec!["fedora-42", "fedora-41"]);

    let doc = load(&path);
    let tail: Vec<&str> = doc.entries()[4..]
        .iter()
        .map(|e| e.distro.as_str())
        .collect();
    assert_eq!(tail, vec!["arch", "arch-rolling", "fedora-42", "fedora-41"]);
    assert_eq!(doc.entries()[6].image, "jrei/systemd-fedora:42");
    assert_eq!(doc.entries()[6].setup, "dnf -y update\ndnf -y install which\n");
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let (dir, path) = scratch();
    let source = upstream();
    let config = config(&path, &["ubuntu"]);

    let outcome = Reconciler::new(&source, &config)
        .dry_run(true)
        .run()
        .await
        .unwrap();

    assert!(outcome.changed());
    assert!(outcome.dry_run);
    assert!(!outcome.written);
    assert_eq!(fs::read_to_string(&path).unwrap(), WORKFLOW);

    let output_path = dir.path().join("github_output");
    emit_github_outputs(&outcome, Some(&GithubOutput::new(&output_path))).unwrap();
    let output = fs::read_to_string(&output_path).unwrap();
    assert!(output.starts_with("changes_made=true\npr_description<<EOF_"));
    assert!(output.contains("### Added distros:\n- ubuntu-24.04\n"));
    assert!(output.contains("### Removed distros (reached end-of-life):\n- ubuntu-20.04\n"));
}

#[tokio::test]
async fn unreadable_workflow_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("distro.yml");
    fs::write(&path, "jobs:\n  other:\n    runs-on: ubuntu-latest\n").unwrap();
    let source = upstream();
    let config = config(&path, &["ubuntu"]);

    let err = Reconciler::new(&source, &config).run().await.unwrap_err();
    assert!(matches!(err, SyncError::Store(StoreError::Unreadable { .. })));
    assert_eq!(source.calls(), vec!["ubuntu"]);
}

#[tokio::test]
async fn retiring_the_last_row_leaves_an_empty_matrix() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("distro.yml");
    let text = format!(
        "jobs:\n  distro-tests:\n    strategy:\n      matrix:\n        include:\n{UBUNTU_20_04}\
         \n    steps:\n      - run: echo done\n"
    );
    fs::write(&path, &text).unwrap();
    let source = StaticReleaseSource::new().with_family("ubuntu", &[("20.04", true)]);
    let config = config(&path, &["ubuntu"]);

    let outcome = Reconciler::new(&source, &config).run().await.unwrap();

    assert_eq!(ids(&outcome.removed), vec!["ubuntu-20.04"]);
    assert!(outcome.added.is_empty());
    assert!(outcome.written);
    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("        include: []\n"));
    assert!(written.ends_with("\n    steps:\n      - run: echo done\n"));
    assert!(load(&path).entries().is_empty());

    let second = Reconciler::new(&source, &config).run().await.unwrap();
    assert_eq!(second, ReconcileOutcome::default());
    assert_eq!(fs::read_to_string(&path).unwrap(), written);
}
