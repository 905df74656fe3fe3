//! Product firmware auto-versioning.
//!
//! Decides whether the version macro embedded in the firmware source
//! needs incrementing, based on git history, and performs the
//! increment. The decision compares the revision that last changed the
//! macro's own line against the newest revision touching the sources
//! folder; any mismatch is treated as unreleased work. This is a
//! heuristic, not a content diff: a comment-only commit inside the
//! sources folder also triggers a bump.
//!
//! The macro rewrite is a first-match textual substitution, not a
//! parser. That is a deliberate simplification; the macro is assumed
//! to appear once with an integer literal argument.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{ActionError, Result};
use crate::repo::{macro_regex, RepoInspector};

/// Default name of the embedded version macro.
pub const DEFAULT_VERSION_MACRO: &str = "PRODUCT_VERSION";

/// Result of a performed version bump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBump {
    pub file: PathBuf,
    pub version: u64,
}

/// Recursively search `sources` for the first file containing the
/// version macro.
///
/// Dot-directories (VCS metadata and the like) are skipped. Ties among
/// multiple matching files resolve to whichever the directory walk
/// yields first; that order is intentionally unspecified.
pub fn find_macro_file(sources: &Path, macro_name: &str) -> Result<PathBuf> {
    let re = macro_regex(macro_name)?;

    let walker = WalkDir::new(sources).into_iter().filter_entry(|e| {
        !(e.depth() > 0
            && e.file_type().is_dir()
            && e.file_name().to_string_lossy().starts_with('.'))
    });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        // Binary or otherwise unreadable files cannot contain the
        // macro; skip them.
        let Ok(content) = fs::read_to_string(entry.path()) else {
            continue;
        };
        if re.is_match(&content) {
            return Ok(entry.path().to_path_buf());
        }
    }

    Err(ActionError::MacroNotFound(macro_name.to_string()))
}

/// Best-effort probe: does this source tree look like product
/// firmware (i.e. does any file carry the version macro)?
///
/// Never fails; any error is treated as "not product firmware".
pub fn is_product_firmware(sources: &Path, macro_name: &str) -> bool {
    find_macro_file(sources, macro_name).is_ok()
}

fn is_dirty_sentinel(fingerprint: &str) -> bool {
    !fingerprint.is_empty() && fingerprint.bytes().all(|b| b == b'0')
}

/// Decide whether a version bump is due.
///
/// Callers must have verified [`RepoInspector::has_full_history`]
/// first; log/blame results from a shallow clone are unreliable and
/// this protocol does not re-check it.
pub fn should_increment_version(
    inspector: &dyn RepoInspector,
    repo: &Path,
    sources: &Path,
    macro_name: &str,
) -> Result<bool> {
    let version_file =
        find_macro_file(sources, macro_name).map_err(|_| ActionError::MacroFileNotFound)?;

    let last_change_revision = inspector.revision_of_last_macro_change(repo, &version_file, macro_name)?;
    let current_sources_revision = inspector.most_recent_revision(repo, sources)?;
    let current_version = inspector.version_at_commit(repo, &version_file, macro_name)?;

    info!("Current firmware version: {current_version} ({current_sources_revision})");
    info!("Firmware version last set at: {last_change_revision}");

    if is_dirty_sentinel(&last_change_revision) {
        warn!("The file with the product version macro has uncommitted changes.");
    }

    if current_sources_revision == last_change_revision {
        info!("No version increment detected. Skipping version increment.");
        return Ok(false);
    }

    info!("Incrementing firmware version to {}.", current_version + 1);
    Ok(true)
}

/// Increment the macro's integer argument in place.
///
/// Reads the live working copy, replaces the integer in the first
/// macro match with `highest historical version + 1`, and overwrites
/// the file. Every other byte is left untouched. There is no rollback:
/// a failed write leaves the file in an undefined state.
pub fn increment_version(
    inspector: &dyn RepoInspector,
    repo: &Path,
    sources: &Path,
    macro_name: &str,
) -> Result<VersionBump> {
    let version_file = find_macro_file(sources, macro_name)?;

    let current = inspector.version_at_commit(repo, &version_file, macro_name)?;
    let next = current + 1;

    let content = fs::read_to_string(&version_file)?;
    let re = macro_regex(macro_name)?;

    let digits = re
        .captures(&content)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| ActionError::MacroNotFound(macro_name.to_string()))?;

    info!(
        "Replacing {} with {next} in {}",
        digits.as_str(),
        version_file.display()
    );

    let mut updated = String::with_capacity(content.len() + 4);
    updated.push_str(&content[..digits.start()]);
    updated.push_str(&next.to_string());
    updated.push_str(&content[digits.end()..]);

    fs::write(&version_file, updated)?;

    Ok(VersionBump {
        file: version_file,
        version: next,
    })
}
