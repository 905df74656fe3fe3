//! Firmware source file set assembly.
//!
//! Collects the files that constitute the firmware source for the
//! compilers: a directory walk keyed by repo-relative path. Project
//! include/ignore globbing (`particle.include` / `particle.ignore`)
//! is out of scope; the walk picks up the file types the buildpack
//! itself detects.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ActionError, Result};

const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp", "h", "hpp", "ino", "properties", "mk"];

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Collect the firmware file map: relative path (forward slashes) to
/// absolute on-disk path. Deterministically ordered. Fails when the
/// walk yields no source files at all.
pub fn collect_source_files(sources: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut files = BTreeMap::new();

    let walker = WalkDir::new(sources).into_iter().filter_entry(|e| {
        !(e.depth() > 0
            && e.file_type().is_dir()
            && e.file_name().to_string_lossy().starts_with('.'))
    });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || !is_source_file(entry.path()) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(sources)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(relative, entry.path().to_path_buf());
    }

    if files.is_empty() {
        return Err(ActionError::Validation(format!(
            "no files included in {}",
            sources.display()
        )));
    }

    Ok(files)
}
