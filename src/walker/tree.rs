//! Deterministic local directory walker
//!
//! Walks a tree depth-first, pre-order, visiting the entries of each
//! directory in lexical order. Entries are stat'ed with `symlink_metadata`,
//! so symbolic links are reported as themselves and never followed.
//!
//! Errors returned by the visitor are handled asymmetrically:
//!
//! ```text
//! visitor(entry) -> Err   entry is a file/link/unknown  -> warn, record, next sibling
//! visitor(entry) -> Err   entry is a directory          -> abort the whole walk
//! visitor(root)  -> Err                                 -> abort the whole walk
//! ```

use crate::error::WalkError;
use std::ffi::OsString;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use tracing::{trace, warn};

/// What the walker should do after a visitor accepted an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Keep going (descend if the entry is a readable directory)
    Continue,

    /// Do not descend into this directory; siblings are still visited
    SkipSubtree,
}

/// Counters and deferred errors from a completed walk
#[derive(Debug, Default)]
pub struct WalkSummary {
    /// Directories visited
    pub dirs: u64,

    /// Non-directory entries visited (including entries that failed to stat)
    pub entries: u64,

    /// Visitor errors for non-directory entries; the walk continued past them
    pub deferred_errors: Vec<WalkError>,
}

impl WalkSummary {
    /// Total number of visitor invocations
    pub fn visited(&self) -> u64 {
        self.dirs + self.entries
    }
}

/// Walk the tree rooted at `root`, calling `visitor` once per entry.
///
/// The visitor receives the entry path, its metadata when the entry could be
/// stat'ed, and the error attached to the entry: the stat error when metadata
/// is absent, or the directory read error when metadata is present.
pub fn walk<F>(root: &Path, mut visitor: F) -> Result<WalkSummary, WalkError>
where
    F: FnMut(&Path, Option<&Metadata>, Option<&io::Error>) -> Result<WalkAction, WalkError>,
{
    let mut summary = WalkSummary::default();

    match fs::symlink_metadata(root) {
        Ok(meta) => walk_node(root, &meta, &mut visitor, &mut summary)?,
        Err(err) => {
            summary.entries += 1;
            visitor(root, None, Some(&err))?;
        }
    }

    Ok(summary)
}

fn walk_node<F>(
    path: &Path,
    meta: &Metadata,
    visitor: &mut F,
    summary: &mut WalkSummary,
) -> Result<(), WalkError>
where
    F: FnMut(&Path, Option<&Metadata>, Option<&io::Error>) -> Result<WalkAction, WalkError>,
{
    if !meta.is_dir() {
        summary.entries += 1;
        visitor(path, Some(meta), None)?;
        return Ok(());
    }

    summary.dirs += 1;
    let names = read_dir_names(path);
    let action = visitor(path, Some(meta), names.as_ref().err())?;

    let names = match (action, names) {
        (WalkAction::Continue, Ok(names)) => names,
        // Skipped, or unreadable and the visitor chose not to abort
        _ => return Ok(()),
    };

    for name in names {
        let child = path.join(&name);

        match fs::symlink_metadata(&child) {
            Ok(child_meta) => {
                if let Err(err) = walk_node(&child, &child_meta, visitor, summary) {
                    if child_meta.is_dir() {
                        return Err(err);
                    }
                    defer(summary, err);
                }
            }
            Err(stat_err) => {
                summary.entries += 1;
                if let Err(err) = visitor(&child, None, Some(&stat_err)) {
                    defer(summary, err);
                }
            }
        }
    }

    Ok(())
}

fn defer(summary: &mut WalkSummary, err: WalkError) {
    warn!(path = %err.path().display(), error = %err, "Continuing walk past entry error");
    summary.deferred_errors.push(err);
}

/// Read the entry names of a directory, sorted lexically
fn read_dir_names(path: &Path) -> io::Result<Vec<OsString>> {
    let mut names = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    trace!(path = %path.display(), count = names.len(), "Read directory");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn relative_paths(root: &Path, visited: &[PathBuf]) -> Vec<String> {
        visited
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_preorder_lexical_traversal() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("c.txt"), "c").unwrap();
        fs::write(root.join("a/2.txt"), "2").unwrap();
        fs::write(root.join("a/1.txt"), "1").unwrap();
        fs::write(root.join("b/inner/x"), "x").unwrap();
        fs::write(root.join("b/z"), "z").unwrap();

        let mut visited = Vec::new();
        let summary = walk(root, |path, _, err| {
            assert!(err.is_none());
            visited.push(path.to_path_buf());
            Ok(WalkAction::Continue)
        })
        .unwrap();

        assert_eq!(
            relative_paths(root, &visited),
            vec!["", "a", "a/1.txt", "a/2.txt", "b", "b/inner", "b/inner/x", "b/z", "c.txt"]
        );
        assert_eq!(summary.dirs, 4);
        assert_eq!(summary.entries, 5);
        assert!(summary.deferred_errors.is_empty());
    }

    #[test]
    fn test_root_file_is_visited() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("only.txt");
        fs::write(&file, "data").unwrap();

        let mut visited = Vec::new();
        let summary = walk(&file, |path, meta, _| {
            assert!(meta.unwrap().is_file());
            visited.push(path.to_path_buf());
            Ok(WalkAction::Continue)
        })
        .unwrap();

        assert_eq!(visited, vec![file]);
        assert_eq!(summary.visited(), 1);
    }

    #[test]
    fn test_missing_root_reports_stat_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");

        let result = walk(&missing, |path, meta, err| {
            assert!(meta.is_none());
            Err(WalkError::stat(path, err.unwrap()))
        });

        assert!(matches!(result, Err(WalkError::Stat { .. })));
    }

    #[test]
    fn test_skip_subtree() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("skip")).unwrap();
        fs::write(root.join("skip/hidden"), "h").unwrap();
        fs::write(root.join("visible"), "v").unwrap();

        let mut visited = Vec::new();
        walk(root, |path, _, _| {
            visited.push(path.to_path_buf());
            if path.ends_with("skip") {
                Ok(WalkAction::SkipSubtree)
            } else {
                Ok(WalkAction::Continue)
            }
        })
        .unwrap();

        assert_eq!(relative_paths(root, &visited), vec!["", "skip", "visible"]);
    }

    #[test]
    fn test_file_error_continues_with_siblings() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for name in ["a", "b", "c"] {
            fs::write(root.join(name), name).unwrap();
        }

        let mut visited = Vec::new();
        let summary = walk(root, |path, _, _| {
            visited.push(path.to_path_buf());
            if path.ends_with("b") {
                return Err(WalkError::Halted {
                    path: path.to_path_buf(),
                });
            }
            Ok(WalkAction::Continue)
        })
        .unwrap();

        assert_eq!(relative_paths(root, &visited), vec!["", "a", "b", "c"]);
        assert_eq!(summary.deferred_errors.len(), 1);
        assert!(summary.deferred_errors[0].path().ends_with("b"));
    }

    #[test]
    fn test_directory_error_aborts_walk() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("a/inside"), "i").unwrap();
        fs::write(root.join("b"), "b").unwrap();

        let mut visited = Vec::new();
        let result = walk(root, |path, _, _| {
            visited.push(path.to_path_buf());
            if path.ends_with("a") {
                return Err(WalkError::Halted {
                    path: path.to_path_buf(),
                });
            }
            Ok(WalkAction::Continue)
        });

        assert!(matches!(result, Err(WalkError::Halted { .. })));
        assert_eq!(relative_paths(root, &visited), vec!["", "a"]);
    }

    #[test]
    fn test_error_in_nested_directory_aborts_from_top() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/deep")).unwrap();
        fs::write(root.join("z"), "z").unwrap();

        let mut visited = Vec::new();
        let result = walk(root, |path, _, _| {
            visited.push(path.to_path_buf());
            if path.ends_with("deep") {
                return Err(WalkError::Halted {
                    path: path.to_path_buf(),
                });
            }
            Ok(WalkAction::Continue)
        });

        assert!(result.is_err());
        assert!(!visited.iter().any(|p| p.ends_with("z")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("real")).unwrap();
        fs::write(root.join("real/file"), "f").unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let mut visited = Vec::new();
        walk(root, |path, meta, _| {
            if path.ends_with("link") {
                assert!(meta.unwrap().file_type().is_symlink());
            }
            visited.push(path.to_path_buf());
            Ok(WalkAction::Continue)
        })
        .unwrap();

        assert_eq!(
            relative_paths(root, &visited),
            vec!["", "link", "real", "real/file"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_reported_and_siblings_visited() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("a")).unwrap();
        fs::create_dir(root.join("locked")).unwrap();
        fs::write(root.join("locked/secret"), "s").unwrap();
        fs::write(root.join("z.txt"), "z").unwrap();
        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read the directory anyway
        if fs::read_dir(root.join("locked")).is_ok() {
            fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut visited = Vec::new();
        let mut errored = Vec::new();
        let result = walk(root, |path, _, err| {
            visited.push(path.to_path_buf());
            if err.is_some() {
                errored.push(path.to_path_buf());
            }
            Ok(WalkAction::Continue)
        });

        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();

        result.unwrap();
        assert_eq!(relative_paths(root, &errored), vec!["locked"]);
        assert_eq!(
            relative_paths(root, &visited),
            vec!["", "a", "locked", "z.txt"]
        );
    }
}
