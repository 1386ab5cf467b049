//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! on the production sources of the workspace:
//! - No sleep() calls: everything waits on I/O or channels
//! - No panicking shortcuts: handlers fail silently, boundaries return errors
//! - No locks around the layer registry: it is single-owner state
//!
//! Test modules (`#[cfg(test)]`) are not production code and are skipped.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["mapsync/core/src", "mapsync/daemon/src"];

/// A production source line
#[derive(Debug, Clone)]
pub struct SourceLine {
    /// File the line belongs to
    pub path: PathBuf,
    /// One-based line number
    pub number: usize,
    /// Code part of the line, with any `//` comment removed
    pub code: String,
}

impl std::fmt::Display for SourceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.number, self.code.trim())
    }
}

/// Workspace root, resolved from this crate's manifest directory
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Collect every production line under `dir` (relative to the workspace root)
///
/// Lines from the first `#[cfg(test)]` of a file onward are skipped.
pub fn production_lines(dir: &str) -> Vec<SourceLine> {
    let root = workspace_root().join(dir);
    let mut lines = Vec::new();

    for entry in walkdir::WalkDir::new(&root)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let Ok(content) = fs::read_to_string(entry.path()) else {
            continue;
        };

        for (idx, line) in content.lines().enumerate() {
            if line.trim_start().starts_with("#[cfg(test)]") {
                break;
            }
            let code = line.split("//").next().unwrap_or(line);
            lines.push(SourceLine {
                path: entry.path().to_path_buf(),
                number: idx + 1,
                code: code.to_string(),
            });
        }
    }
    lines
}

/// Production lines across all [`PRODUCTION_DIRS`] containing any of `patterns`
pub fn find_violations(dirs: &[&str], patterns: &[&str]) -> Vec<SourceLine> {
    dirs.iter()
        .flat_map(|dir| production_lines(dir))
        .filter(|line| patterns.iter().any(|p| line.code.contains(p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_dirs_exist() {
        for dir in PRODUCTION_DIRS {
            assert!(
                workspace_root().join(dir).is_dir(),
                "missing production dir {dir}"
            );
            assert!(!production_lines(dir).is_empty());
        }
    }
}
