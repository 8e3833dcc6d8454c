//! File scanner (C1): walks a workspace recursively, filters by extension,
//! and excludes version-control metadata, cache directories, and the
//! system's own index dir. Output is a deterministic (sorted) sequence of
//! absolute paths; no file content is read here.

use std::path::{Path, PathBuf};

const SOURCE_EXTENSIONS: &[&str] = &["py", "c", "h", "cpp", "hpp", "cc", "cxx", "hxx"];

const EXCLUDED_DIR_NAMES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "__pycache__",
    "node_modules",
    "target",
    ".codegraph-index",
];

pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn is_excluded(entry: &Path) -> bool {
    entry
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| EXCLUDED_DIR_NAMES.contains(&n))
        .unwrap_or(false)
}

/// Walks `root` recursively and returns a sorted list of absolute paths to
/// every source file under it, skipping excluded directories entirely
/// (they are never descended into).
pub fn scan_workspace(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(path = %dir.display(), error = %err, "failed to read directory, skipping");
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to read directory entry, skipping");
                    continue;
                }
            };
            let path = entry.path();

            if path.is_dir() {
                if !is_excluded(&path) {
                    stack.push(path);
                }
                continue;
            }

            if is_source_file(&path) {
                out.push(path.canonicalize().unwrap_or(path));
            }
        }
    }

    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_skips_excluded_dirs_and_sorts_output() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("src/b.py"), "").unwrap();
        fs::write(root.join("src/a.c"), "").unwrap();
        fs::write(root.join(".git/hidden.py"), "").unwrap();
        fs::write(root.join("README.md"), "").unwrap();

        let files = scan_workspace(root).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0] < files[1]);
        assert!(files.iter().all(|p| !p.to_string_lossy().contains(".git")));
    }

    #[test]
    fn unsupported_extensions_are_filtered() {
        assert!(is_source_file(Path::new("main.py")));
        assert!(is_source_file(Path::new("foo.h")));
        assert!(!is_source_file(Path::new("README.md")));
    }
}
