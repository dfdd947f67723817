//! Data types flowing through the work engine

use crate::error::Fatal;
use std::collections::BTreeMap;
use std::time::Duration;

/// One independently processable unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// A file to hash (build mode). Holds the manifest key for the file.
    FilePath(String),

    /// A file to re-hash and compare (verify mode)
    PathDigestPair { path: String, expected: String },
}

impl WorkItem {
    /// The manifest key this item refers to
    pub fn key(&self) -> &str {
        match self {
            WorkItem::FilePath(path) => path,
            WorkItem::PathDigestPair { path, .. } => path,
        }
    }

    /// Short variant name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            WorkItem::FilePath(_) => "FilePath",
            WorkItem::PathDigestPair { .. } => "PathDigestPair",
        }
    }

    /// Fatal condition for a worker that does not handle this variant
    pub fn unexpected_in(&self, pipeline: &'static str) -> Fatal {
        Fatal::UnexpectedItem {
            pipeline,
            item: self.kind(),
            key: self.key().to_string(),
        }
    }
}

/// How the aggregator treats a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Keep in the mapping and notify the observer
    Store,

    /// Notify the observer but do not keep
    CountOnly,

    /// Neither keep nor notify
    Ignore,
}

/// What a worker produced for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord<V> {
    pub key: String,
    pub value: V,
    pub outcome: Outcome,
}

impl<V> ResultRecord<V> {
    pub fn store(key: impl Into<String>, value: V) -> Self {
        Self::new(key, value, Outcome::Store)
    }

    pub fn count_only(key: impl Into<String>, value: V) -> Self {
        Self::new(key, value, Outcome::CountOnly)
    }

    pub fn ignore(key: impl Into<String>, value: V) -> Self {
        Self::new(key, value, Outcome::Ignore)
    }

    fn new(key: impl Into<String>, value: V, outcome: Outcome) -> Self {
        Self {
            key: key.into(),
            value,
            outcome,
        }
    }
}

/// The terminal artifact of one engine run
pub type ResultMapping<V> = BTreeMap<String, V>;

/// Counters for a completed engine run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Records kept in the mapping
    pub stored: u64,

    /// Records observed but not kept
    pub counted: u64,

    /// Records dropped silently
    pub ignored: u64,

    /// Wall time of the run
    pub duration: Duration,
}

impl EngineStats {
    /// Number of items processed by the workers
    pub fn processed(&self) -> u64 {
        self.stored + self.counted + self.ignored
    }

    /// Items per second over the run
    pub fn items_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.processed() as f64 / secs
        } else {
            0.0
        }
    }
}
