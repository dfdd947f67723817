//! Manifest builder
//!
//! Walks a directory tree and hashes every regular file in parallel:
//!
//! ```text
//! walker (producer thread) ──FilePath──► hash workers ──Store(path, digest)──► Manifest
//! ```
//!
//! A file that cannot be read is not an error for the build: its error text
//! is stored in place of the digest, so the failure shows up as a mismatch on
//! the next verification.

use super::format::Manifest;
use crate::content::sha256_file;
use crate::engine::{self, Emitter, EngineConfig, EngineStats, ResultMapping, ResultRecord, WorkItem};
use crate::error::{EngineError, Fatal, Result, WalkError};
use crate::walker::{walk, WalkAction, WalkSummary};
use std::env;
use std::fs::{self, Metadata};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Settings for one build
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory (or single file) to hash
    pub root: PathBuf,

    /// Number of hashing workers
    pub worker_count: usize,

    /// Directory manifest keys are made relative to; current directory if unset
    pub base: Option<PathBuf>,

    /// Files never included in the manifest (e.g. the verification file itself)
    pub exclude: Vec<PathBuf>,
}

impl BuildConfig {
    pub fn new(root: impl Into<PathBuf>, worker_count: usize) -> Self {
        Self {
            root: root.into(),
            worker_count,
            base: None,
            exclude: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude.push(path.into());
        self
    }
}

/// A built manifest plus what it took to build it
#[derive(Debug)]
pub struct BuildOutput {
    pub manifest: Manifest,
    pub stats: EngineStats,
    pub walk: WalkSummary,

    /// Directories left out because their contents could not be listed
    pub skipped_dirs: u64,
}

/// Build the manifest for `config.root`.
///
/// `observer` sees every `(path, digest)` pair as it is aggregated, in
/// completion order.
pub fn build_manifest<O>(config: &BuildConfig, mut observer: O) -> Result<BuildOutput>
where
    O: FnMut(&str, &str),
{
    let cwd = env::current_dir()?;
    let base = match &config.base {
        Some(base) => normalize(&absolutize(base, &cwd)),
        None => normalize(&cwd),
    };
    let excluded: Vec<PathBuf> = config
        .exclude
        .iter()
        .filter_map(|p| canonical_target(p))
        .collect();

    let scan = Scan {
        root: &config.root,
        cwd: &cwd,
        base: &base,
        excluded: &excluded,
    };

    info!(
        root = %config.root.display(),
        workers = config.worker_count,
        "Building manifest"
    );

    let mut walk_summary = None;
    let mut skipped_dirs = 0u64;
    let mut manifest = None;

    let stats = engine::run(EngineConfig {
        producer: |emitter: &Emitter<WorkItem>| {
            walk_summary = Some(scan.produce(emitter, &mut skipped_dirs)?);
            Ok::<(), WalkError>(())
        },
        worker_count: config.worker_count,
        worker: |item: WorkItem| hash_item(item, &base),
        observer: |key: &str, digest: &String| observer(key, digest),
        result_sink: |mapping: ResultMapping<String>| manifest = Some(Manifest::from(mapping)),
    })?;

    let manifest = manifest.ok_or_else(|| {
        EngineError::from(Fatal::Invariant("result sink was not called".into()))
    })?;
    let walk = walk_summary.unwrap_or_default();

    info!(
        files = manifest.len(),
        dirs = walk.dirs,
        skipped_dirs,
        walk_errors = walk.deferred_errors.len(),
        duration_ms = stats.duration.as_millis() as u64,
        "Manifest built"
    );

    Ok(BuildOutput {
        manifest,
        stats,
        walk,
        skipped_dirs,
    })
}

/// Walk state shared with the producer thread
struct Scan<'a> {
    root: &'a Path,
    cwd: &'a Path,
    base: &'a Path,
    excluded: &'a [PathBuf],
}

impl Scan<'_> {
    /// Emit one `FilePath` per regular file under the root
    fn produce(
        &self,
        emitter: &Emitter<WorkItem>,
        skipped_dirs: &mut u64,
    ) -> std::result::Result<WalkSummary, WalkError> {
        let mut halted = false;

        let summary = walk(self.root, |path, meta, err| {
            if halted {
                return Ok(WalkAction::SkipSubtree);
            }

            if let Some(err) = err {
                let is_dir = meta.is_some_and(Metadata::is_dir);
                if !is_dir {
                    return Err(WalkError::stat(path, err));
                }
                if path == self.root {
                    return Err(WalkError::read_dir(path, err));
                }
                warn!(path = %path.display(), error = %err, "Skipping unreadable directory");
                *skipped_dirs += 1;
                return Ok(WalkAction::SkipSubtree);
            }

            let is_file = meta.is_some_and(Metadata::is_file);
            if !is_file {
                return Ok(WalkAction::Continue);
            }

            if self.is_excluded(path) {
                debug!(path = %path.display(), "Excluded from manifest");
                return Ok(WalkAction::Continue);
            }

            if emitter.emit(WorkItem::FilePath(self.manifest_key(path))).is_err() {
                halted = true;
            }
            Ok(WalkAction::Continue)
        })?;

        if halted {
            return Err(WalkError::Halted {
                path: self.root.to_path_buf(),
            });
        }
        Ok(summary)
    }

    /// Path relative to the base directory, climbing out of it with `..`
    /// where needed. Absolute only when no relative form exists.
    fn manifest_key(&self, path: &Path) -> String {
        let absolute = normalize(&absolutize(path, self.cwd));
        let key = relative_to(&absolute, self.base).unwrap_or(absolute);
        match key.to_str() {
            Some(key) => key.to_string(),
            None => {
                warn!(
                    path = %key.display(),
                    "File name is not valid UTF-8; its manifest entry will not verify"
                );
                key.to_string_lossy().into_owned()
            }
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        let name = path.file_name();
        self.excluded
            .iter()
            .filter(|ex| ex.file_name() == name)
            .any(|ex| fs::canonicalize(path).is_ok_and(|p| &p == ex))
    }
}

fn hash_item(item: WorkItem, base: &Path) -> std::result::Result<ResultRecord<String>, Fatal> {
    match item {
        WorkItem::FilePath(key) => {
            let value = match sha256_file(&base.join(&key)) {
                Ok(digest) => digest,
                Err(err) => {
                    warn!(path = %key, error = %err, "Failed to hash file, recording error in manifest");
                    err.to_string()
                }
            };
            Ok(ResultRecord::store(key, value))
        }
        other => Err(other.unexpected_in("build")),
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Lexically resolve `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// `path` expressed relative to `base`; both must be normalized.
///
/// Returns `None` when the two do not share a root (e.g. different drives).
fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    if path.has_root() != base.has_root() {
        return None;
    }

    let common = path
        .components()
        .zip(base.components())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for component in base.components().skip(common) {
        match component {
            Component::Normal(_) => relative.push(".."),
            _ => return None,
        }
    }
    for component in path.components().skip(common) {
        match component {
            Component::Normal(_) | Component::ParentDir => relative.push(component),
            _ => return None,
        }
    }

    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Some(relative)
}

/// Canonical form of a path that may not exist yet
fn canonical_target(path: &Path) -> Option<PathBuf> {
    fs::canonicalize(path).ok().or_else(|| {
        let name = path.file_name()?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::canonicalize(parent).ok().map(|dir| dir.join(name))
    })
}
