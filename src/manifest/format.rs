//! Manifest and mismatch report types
//!
//! A manifest is a JSON object mapping relative file paths to lowercase hex
//! SHA-256 digests:
//!
//! ```json
//! {"a.txt":"2cf24dba...","sub/b.txt":"486ea462..."}
//! ```
//!
//! Keys are kept sorted so the encoded bytes (and therefore the signature)
//! are deterministic for a given tree.

use crate::engine::ResultMapping;
use crate::error::ManifestError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from relative file path to hex digest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode manifest JSON
    pub fn from_json(bytes: &[u8]) -> Result<Self, ManifestError> {
        serde_json::from_slice(bytes).map_err(ManifestError::Parse)
    }

    /// Encode as compact JSON
    pub fn to_json(&self) -> Result<Vec<u8>, ManifestError> {
        serde_json::to_vec(self).map_err(ManifestError::Encode)
    }

    pub fn insert(&mut self, path: impl Into<String>, digest: impl Into<String>) {
        self.entries.insert(path.into(), digest.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries whose value is not a digest, i.e. files that could not be
    /// read when the manifest was built
    pub fn unreadable(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .filter(|(_, value)| !crate::content::is_digest(value))
    }
}

impl From<ResultMapping<String>> for Manifest {
    fn from(entries: ResultMapping<String>) -> Self {
        Self { entries }
    }
}

/// Result of re-checking one file against the manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCheck {
    /// Content still hashes to the recorded digest
    Verified { digest: String },

    /// Content hashes to something else; holds the digest recorded at build time
    Mismatch { expected: String },

    /// The file could not be read
    Unreadable { reason: String },
}

impl FileCheck {
    pub fn is_verified(&self) -> bool {
        matches!(self, FileCheck::Verified { .. })
    }
}

/// Displays the recorded digest, or the read error text
impl fmt::Display for FileCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileCheck::Verified { digest } => f.write_str(digest),
            FileCheck::Mismatch { expected } => f.write_str(expected),
            FileCheck::Unreadable { reason } => f.write_str(reason),
        }
    }
}

/// Files that failed verification; empty means the tree is intact
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MismatchReport {
    entries: BTreeMap<String, FileCheck>,
}

impl MismatchReport {
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FileCheck> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileCheck)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flatten to path → diagnostic text
    pub fn to_strings(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl From<ResultMapping<FileCheck>> for MismatchReport {
    fn from(entries: ResultMapping<FileCheck>) -> Self {
        Self { entries }
    }
}
