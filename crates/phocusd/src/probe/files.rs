//! File and directory primitives shared by the probe sets.

use regex::{Regex, RegexBuilder};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use super::ProbeError;

/// Compile a catalog pattern; `^`/`$` match at line boundaries
pub fn compile(pattern: &str) -> Result<Regex, ProbeError> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|source| ProbeError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}

pub fn read(path: &Path) -> Result<String, ProbeError> {
    fs::read_to_string(path).map_err(|e| ProbeError::io(path, e))
}

/// Missing path is `false`; any other failure is an error
pub fn exists(path: &Path) -> Result<bool, ProbeError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ProbeError::io(path, e)),
    }
}

pub fn contains(path: &Path, text: &str) -> Result<bool, ProbeError> {
    Ok(read(path)?.contains(text))
}

pub fn contains_regex(path: &Path, re: &Regex) -> Result<bool, ProbeError> {
    Ok(re.is_match(&read(path)?))
}

/// Walk `dir` recursively and report whether any file matches.
///
/// Files that cannot be read as UTF-8 text are skipped. The directory
/// itself must exist.
pub fn dir_contains_regex(dir: &Path, re: &Regex) -> Result<bool, ProbeError> {
    let meta = fs::metadata(dir).map_err(|e| ProbeError::io(dir, e))?;
    if !meta.is_dir() {
        return Err(ProbeError::io(
            dir,
            std::io::Error::new(ErrorKind::Other, "not a directory"),
        ));
    }

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match fs::read_to_string(entry.path()) {
            Ok(content) if re.is_match(&content) => {
                debug!("Pattern matched in {}", entry.path().display());
                return Ok(true);
            }
            Ok(_) => {}
            Err(e) => debug!("Skipping {}: {}", entry.path().display(), e),
        }
    }

    Ok(false)
}
