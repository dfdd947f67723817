//! Manifest verifier
//!
//! Re-hashes every file named in a manifest and reports the ones that no
//! longer match. Matches are counted (for progress) but not kept, so an empty
//! report means the tree is intact.

use super::format::{FileCheck, Manifest, MismatchReport};
use crate::content::sha256_file;
use crate::engine::{self, Emitter, EngineConfig, EngineStats, ResultMapping, ResultRecord, WorkItem};
use crate::error::{EngineError, Fatal, HandoffClosed, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Settings for one verification
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Number of hashing workers
    pub worker_count: usize,

    /// Directory relative manifest paths are resolved against; current
    /// directory if unset
    pub base: Option<PathBuf>,
}

impl VerifyConfig {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            base: None,
        }
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }
}

#[derive(Debug)]
pub struct VerifyOutput {
    pub report: MismatchReport,
    pub stats: EngineStats,
}

impl VerifyOutput {
    /// Files whose content still matches
    pub fn verified(&self) -> u64 {
        self.stats.counted
    }
}

/// Check every manifest entry against the file on disk.
///
/// `observer` sees every checked file, matching or not, in completion order.
pub fn verify_manifest<O>(manifest: &Manifest, config: &VerifyConfig, mut observer: O) -> Result<VerifyOutput>
where
    O: FnMut(&str, &FileCheck),
{
    let base = match &config.base {
        Some(base) if base.is_absolute() => base.clone(),
        Some(base) => env::current_dir()?.join(base),
        None => env::current_dir()?,
    };

    info!(
        files = manifest.len(),
        workers = config.worker_count,
        "Verifying manifest"
    );

    let mut report = None;

    let stats = engine::run(EngineConfig {
        producer: |emitter: &Emitter<WorkItem>| {
            for (path, expected) in manifest.iter() {
                emitter.emit(WorkItem::PathDigestPair {
                    path: path.to_string(),
                    expected: expected.to_string(),
                })?;
            }
            Ok::<(), HandoffClosed>(())
        },
        worker_count: config.worker_count,
        worker: |item: WorkItem| check_item(item, &base),
        observer: |key: &str, check: &FileCheck| observer(key, check),
        result_sink: |mapping: ResultMapping<FileCheck>| report = Some(MismatchReport::from(mapping)),
    })?;

    let report = report.ok_or_else(|| {
        EngineError::from(Fatal::Invariant("result sink was not called".into()))
    })?;

    info!(
        verified = stats.counted,
        failed = report.len(),
        duration_ms = stats.duration.as_millis() as u64,
        "Verification finished"
    );

    Ok(VerifyOutput { report, stats })
}

fn check_item(item: WorkItem, base: &Path) -> std::result::Result<ResultRecord<FileCheck>, Fatal> {
    match item {
        WorkItem::PathDigestPair { path, expected } => {
            let record = match sha256_file(&base.join(&path)) {
                Ok(digest) if digest == expected => {
                    ResultRecord::count_only(path, FileCheck::Verified { digest })
                }
                Ok(actual) => {
                    debug!(path = %path, %expected, %actual, "Digest mismatch");
                    ResultRecord::store(path, FileCheck::Mismatch { expected })
                }
                Err(err) => {
                    debug!(path = %path, error = %err, "Failed to read file");
                    ResultRecord::store(
                        path,
                        FileCheck::Unreadable {
                            reason: err.to_string(),
                        },
                    )
                }
            };
            Ok(record)
        }
        other => Err(other.unexpected_in("verify")),
    }
}
