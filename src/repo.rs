//! Repository inspector over a git-tracked source tree.
//!
//! A narrow interface of five read operations, implemented by shelling
//! out to the `git` binary. The blame and history parsing is kept in
//! pure helpers so it can be tested against fixture strings without a
//! repository.

use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;
use tracing::debug;

use crate::error::{ActionError, Result};

/// Width of an abbreviated commit fingerprint.
const FINGERPRINT_LEN: usize = 7;

/// Read operations the auto-versioning engine needs from the version
/// control system.
pub trait RepoInspector {
    /// Walk upward from `start` to the nearest git working tree root.
    fn find_nearest_root(&self, start: &Path) -> Result<PathBuf>;

    /// True iff the repository is not a shallow clone. Shallow history
    /// cannot be trusted for log/blame based reasoning.
    fn has_full_history(&self, repo: &Path) -> Result<bool>;

    /// Fingerprint of the newest commit touching `sub_path`.
    fn most_recent_revision(&self, repo: &Path, sub_path: &Path) -> Result<String>;

    /// Fingerprint of the commit that last changed the macro line in
    /// `file`, per line-level blame. Returns the all-zero sentinel
    /// verbatim when the line is uncommitted.
    fn revision_of_last_macro_change(
        &self,
        repo: &Path,
        file: &Path,
        macro_name: &str,
    ) -> Result<String>;

    /// Highest macro value seen in any commit touching `file`. The
    /// macro is assumed to only ever be incremented, but the running
    /// max never relies on that. Returns 0 when no commit matched.
    fn version_at_commit(&self, repo: &Path, file: &Path, macro_name: &str) -> Result<u64>;
}

/// Pattern matching a version macro invocation, e.g.
/// `PRODUCT_VERSION(5)`, anywhere in a file.
pub(crate) fn macro_regex(macro_name: &str) -> Result<Regex> {
    Ok(Regex::new(&format!(
        r"(?m)^.*{}.*\((\d+)\)",
        regex::escape(macro_name)
    ))?)
}

/// Extract the integer argument of the first macro match in `content`.
pub(crate) fn macro_version(content: &str, macro_name: &str) -> Result<Option<u64>> {
    let re = macro_regex(macro_name)?;
    Ok(re
        .captures(content)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok()))
}

/// Find the macro line in raw `git blame` output and return the
/// attributing commit's fingerprint.
///
/// The `^` boundary marker on initial commits is stripped before
/// truncation. An all-zero hash means the line is uncommitted and is
/// returned verbatim so callers can warn about the dirty working tree.
pub(crate) fn blame_revision(blame: &str, macro_name: &str) -> Result<String> {
    let re = Regex::new(&format!(
        r"(?m)^\^?([0-9a-f]+)\b.+{}.*\(\d+\)",
        regex::escape(macro_name)
    ))?;

    let hash = re
        .captures(blame)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ActionError::NoBumpHistory(macro_name.to_string()))?;

    if hash.bytes().all(|b| b == b'0') {
        return Ok(hash.to_string());
    }
    Ok(hash.chars().take(FINGERPRINT_LEN).collect())
}

/// Inspector backed by the `git` CLI.
#[derive(Debug, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    fn git(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        debug!("git {} (in {})", args.join(" "), cwd.display());
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| ActionError::Git(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ActionError::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Path of `file` relative to the repository root; git show and
    /// blame want repo-relative paths.
    fn relative<'a>(&self, repo: &Path, file: &'a Path) -> &'a Path {
        file.strip_prefix(repo).unwrap_or(file)
    }
}

impl RepoInspector for GitCli {
    fn find_nearest_root(&self, start: &Path) -> Result<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            if dir.is_dir() {
                if let Ok(top) = self.git(&dir, &["rev-parse", "--show-toplevel"]) {
                    return Ok(PathBuf::from(top.trim()));
                }
            }
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => return Err(ActionError::NoRepository),
            }
        }
    }

    fn has_full_history(&self, repo: &Path) -> Result<bool> {
        let out = self.git(repo, &["rev-parse", "--is-shallow-repository"])?;
        Ok(out.trim() == "false")
    }

    fn most_recent_revision(&self, repo: &Path, sub_path: &Path) -> Result<String> {
        let path = self.relative(repo, sub_path);
        let path_str = path.to_string_lossy();
        let hash = self
            .git(
                repo,
                &["log", "-n", "1", "--pretty=format:%H", "--", &path_str],
            )
            .map_err(|e| {
                ActionError::Git(format!(
                    "Error getting the latest Git revision for folder \"{}\": {e}",
                    sub_path.display()
                ))
            })?;
        let hash = hash.trim();
        if hash.is_empty() {
            return Err(ActionError::Git(format!(
                "Error getting the latest Git revision for folder \"{}\": no revision found",
                sub_path.display()
            )));
        }
        Ok(hash.chars().take(FINGERPRINT_LEN).collect())
    }

    fn revision_of_last_macro_change(
        &self,
        repo: &Path,
        file: &Path,
        macro_name: &str,
    ) -> Result<String> {
        let path = self.relative(repo, file);
        let blame = self.git(repo, &["blame", &path.to_string_lossy()])?;
        blame_revision(&blame, macro_name)
    }

    fn version_at_commit(&self, repo: &Path, file: &Path, macro_name: &str) -> Result<u64> {
        let path = self.relative(repo, file);
        let path_str = path.to_string_lossy();
        let log = self.git(repo, &["log", "--pretty=format:%H", "--", &path_str])?;

        let mut highest = 0u64;
        for hash in log.lines().map(str::trim).filter(|l| !l.is_empty()) {
            // The file may not exist at every commit touching its
            // history (renames, deletions); that is skippable.
            let Ok(content) = self.git(repo, &["show", &format!("{hash}:{path_str}")]) else {
                continue;
            };
            if let Some(version) = macro_version(&content, macro_name)? {
                highest = highest.max(version);
            }
        }
        Ok(highest)
    }
}
