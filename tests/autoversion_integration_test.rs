//! End-to-end tests for the repository inspector and the
//! auto-versioning engine against real git repositories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use compile_action::autoversion::{
    find_macro_file, increment_version, is_product_firmware, should_increment_version,
};
use compile_action::repo::{GitCli, RepoInspector};

const MACRO: &str = "PRODUCT_VERSION";

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn make_repo() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    run_git(&root, &["init"]);
    run_git(&root, &["config", "user.name", "test-user"]);
    run_git(&root, &["config", "user.email", "test@example.com"]);
    (dir, root)
}

fn commit_all(repo: &Path, message: &str) {
    run_git(repo, &["add", "-A"]);
    run_git(repo, &["commit", "-m", message]);
}

fn head_fingerprint(repo: &Path) -> String {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(repo)
        .output()
        .unwrap();
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .chars()
        .take(7)
        .collect()
}

fn write_firmware(repo: &Path, version: u64) {
    fs::create_dir_all(repo.join("sources/src")).unwrap();
    fs::write(
        repo.join("sources/src/application.cpp"),
        format!("#include \"app.h\"\nPRODUCT_ID(1234);\nPRODUCT_VERSION({version});\n"),
    )
    .unwrap();
}

#[test]
fn find_nearest_root_walks_up_from_a_subdirectory() {
    let (_dir, root) = make_repo();
    fs::create_dir_all(root.join("a/b/c")).unwrap();

    let inspector = GitCli::new();
    let found = inspector.find_nearest_root(&root.join("a/b/c")).unwrap();
    assert_eq!(found.canonicalize().unwrap(), root);
}

#[test]
fn find_nearest_root_fails_outside_any_repository() {
    let dir = TempDir::new().unwrap();
    let inspector = GitCli::new();
    let err = inspector.find_nearest_root(dir.path()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "No Git repository found in the parent directories"
    );
}

#[test]
fn has_full_history_is_true_for_a_regular_clone() {
    let (_dir, root) = make_repo();
    write_firmware(&root, 1);
    commit_all(&root, "initial");

    let inspector = GitCli::new();
    assert!(inspector.has_full_history(&root).unwrap());
}

#[test]
fn has_full_history_is_false_for_a_shallow_clone() {
    let (_dir, root) = make_repo();
    write_firmware(&root, 1);
    commit_all(&root, "one");
    write_firmware(&root, 2);
    commit_all(&root, "two");

    let clone_dir = TempDir::new().unwrap();
    let clone_path = clone_dir.path().join("shallow");
    run_git(
        clone_dir.path(),
        &[
            "clone",
            "--depth",
            "1",
            &format!("file://{}", root.display()),
            clone_path.to_str().unwrap(),
        ],
    );

    let inspector = GitCli::new();
    assert!(!inspector.has_full_history(&clone_path).unwrap());
}

#[test]
fn most_recent_revision_tracks_the_newest_commit_touching_a_folder() {
    let (_dir, root) = make_repo();
    write_firmware(&root, 1);
    commit_all(&root, "firmware");

    fs::write(root.join("README.md"), "docs").unwrap();
    commit_all(&root, "docs only");
    let docs_commit = head_fingerprint(&root);

    let inspector = GitCli::new();
    // The docs commit did not touch sources/.
    let sources_rev = inspector
        .most_recent_revision(&root, &root.join("sources"))
        .unwrap();
    assert_ne!(sources_rev, docs_commit);
    assert_eq!(sources_rev.len(), 7);

    write_firmware(&root, 1); // touch a file under sources/
    fs::write(root.join("sources/src/extra.cpp"), "// extra").unwrap();
    commit_all(&root, "more firmware");
    let firmware_commit = head_fingerprint(&root);

    let sources_rev = inspector
        .most_recent_revision(&root, &root.join("sources"))
        .unwrap();
    assert_eq!(sources_rev, firmware_commit);
}

#[test]
fn most_recent_revision_fails_for_a_path_never_committed() {
    let (_dir, root) = make_repo();
    write_firmware(&root, 1);
    commit_all(&root, "firmware");

    let inspector = GitCli::new();
    let err = inspector
        .most_recent_revision(&root, &root.join("not-committed"))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("Error getting the latest Git revision for folder"));
}

#[test]
fn revision_of_last_macro_change_attributes_the_bump_commit() {
    let (_dir, root) = make_repo();
    write_firmware(&root, 1);
    commit_all(&root, "initial");

    // Unrelated change to the same file must not move the macro line's
    // attribution.
    let file = root.join("sources/src/application.cpp");
    let content = fs::read_to_string(&file).unwrap();
    fs::write(&file, format!("{content}// trailing comment\n")).unwrap();
    commit_all(&root, "comment");

    let inspector = GitCli::new();
    let rev = inspector
        .revision_of_last_macro_change(&root, &file, MACRO)
        .unwrap();
    assert_eq!(rev.len(), 7);
    assert_ne!(rev, head_fingerprint(&root));

    // Now bump the macro; attribution follows.
    write_firmware(&root, 2);
    commit_all(&root, "bump");
    let rev = inspector
        .revision_of_last_macro_change(&root, &file, MACRO)
        .unwrap();
    assert_eq!(rev, head_fingerprint(&root));
}

#[test]
fn revision_of_last_macro_change_reports_uncommitted_edits_as_zeros() {
    let (_dir, root) = make_repo();
    write_firmware(&root, 1);
    commit_all(&root, "initial");

    write_firmware(&root, 2); // uncommitted macro edit

    let inspector = GitCli::new();
    let rev = inspector
        .revision_of_last_macro_change(&root, &root.join("sources/src/application.cpp"), MACRO)
        .unwrap();
    assert!(rev.bytes().all(|b| b == b'0'), "expected zeros, got {rev}");
}

#[test]
fn version_at_commit_takes_the_maximum_not_the_most_recent() {
    let (_dir, root) = make_repo();
    for version in [1u64, 3, 2] {
        write_firmware(&root, version);
        commit_all(&root, &format!("version {version}"));
    }

    let inspector = GitCli::new();
    let version = inspector
        .version_at_commit(&root, &root.join("sources/src/application.cpp"), MACRO)
        .unwrap();
    assert_eq!(version, 3);
}

#[test]
fn version_at_commit_tolerates_deletion_in_history() {
    let (_dir, root) = make_repo();
    write_firmware(&root, 1);
    commit_all(&root, "initial");

    fs::remove_file(root.join("sources/src/application.cpp")).unwrap();
    commit_all(&root, "deleted");

    write_firmware(&root, 2);
    commit_all(&root, "restored");

    let inspector = GitCli::new();
    let version = inspector
        .version_at_commit(&root, &root.join("sources/src/application.cpp"), MACRO)
        .unwrap();
    assert_eq!(version, 2);
}

#[test]
fn version_at_commit_is_zero_without_a_macro_in_history() {
    let (_dir, root) = make_repo();
    fs::create_dir_all(root.join("sources")).unwrap();
    fs::write(root.join("sources/plain.cpp"), "// no macro here").unwrap();
    commit_all(&root, "plain");

    let inspector = GitCli::new();
    let version = inspector
        .version_at_commit(&root, &root.join("sources/plain.cpp"), MACRO)
        .unwrap();
    assert_eq!(version, 0);
}

#[test]
fn bump_cycle_against_a_real_repository() {
    let (_dir, root) = make_repo();
    let sources = root.join("sources");
    write_firmware(&root, 1);
    commit_all(&root, "initial");

    let inspector = GitCli::new();
    assert!(is_product_firmware(&sources, MACRO));

    // Nothing committed since the macro was last set.
    assert!(!should_increment_version(&inspector, &root, &sources, MACRO).unwrap());

    // New work under sources/ makes a bump due, and the decision is
    // stable across repeated calls.
    fs::write(sources.join("src/feature.cpp"), "// new feature").unwrap();
    commit_all(&root, "feature");
    assert!(should_increment_version(&inspector, &root, &sources, MACRO).unwrap());
    assert!(should_increment_version(&inspector, &root, &sources, MACRO).unwrap());

    let bump = increment_version(&inspector, &root, &sources, MACRO).unwrap();
    assert_eq!(bump.version, 2);
    assert_eq!(bump.file, find_macro_file(&sources, MACRO).unwrap());
    let on_disk = fs::read_to_string(&bump.file).unwrap();
    assert!(on_disk.contains("PRODUCT_VERSION(2)"));
    assert!(on_disk.contains("PRODUCT_ID(1234)"));

    // Committing the bump settles the decision back to false.
    commit_all(&root, "bump to 2");
    assert!(!should_increment_version(&inspector, &root, &sources, MACRO).unwrap());
}
