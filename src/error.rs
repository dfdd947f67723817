//! Error types for dir-verifier
//!
//! This module defines the error hierarchy that covers:
//! - Directory traversal errors
//! - Work engine failures (fatal records, producer errors, panics)
//! - Manifest encoding and decoding
//! - Key storage and signed container errors
//! - Configuration and CLI errors
//!
//! Per-file read failures are deliberately absent: they are folded into the
//! manifest or mismatch report as data and never surface as an `Err`.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for the dir-verifier library
#[derive(Error, Debug)]
pub enum VerifierError {
    /// Directory traversal errors
    #[error("Walk error: {0}")]
    Walk(#[from] WalkError),

    /// Work engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Manifest encoding/decoding errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Key storage errors
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    /// Signed container errors
    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors (working directory lookup, container files, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VerifierError {
    /// Whether this error means the signed container failed verification,
    /// as opposed to an operational failure.
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, VerifierError::Signature(_))
    }
}

/// Directory traversal errors
#[derive(Error, Debug)]
pub enum WalkError {
    /// Stat (lstat) of an entry failed
    #[error("Failed to stat '{}': {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading a directory's entries failed
    #[error("Failed to read directory '{}': {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The visitor stopped the walk because nothing downstream accepts work
    #[error("Walk halted at '{}': work handoff closed", path.display())]
    Halted { path: PathBuf },
}

impl WalkError {
    /// Build a `Stat` error from the borrowed error handed to a visitor
    pub fn stat(path: &Path, err: &io::Error) -> Self {
        WalkError::Stat {
            path: path.to_path_buf(),
            source: io::Error::new(err.kind(), err.to_string()),
        }
    }

    /// Build a `ReadDir` error from the borrowed error handed to a visitor
    pub fn read_dir(path: &Path, err: &io::Error) -> Self {
        WalkError::ReadDir {
            path: path.to_path_buf(),
            source: io::Error::new(err.kind(), err.to_string()),
        }
    }

    /// Path of the entry this error is attached to
    pub fn path(&self) -> &Path {
        match self {
            WalkError::Stat { path, .. } => path,
            WalkError::ReadDir { path, .. } => path,
            WalkError::Halted { path } => path,
        }
    }
}

/// A condition that aborts an engine run before any mapping is delivered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fatal {
    /// A worker received a work item variant its pipeline does not handle
    #[error("{pipeline} worker received unexpected {item} work item for '{key}'")]
    UnexpectedItem {
        pipeline: &'static str,
        item: &'static str,
        key: String,
    },

    /// An internal engine invariant did not hold
    #[error("Engine invariant violated: {0}")]
    Invariant(String),
}

/// Work engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine needs at least one worker
    #[error("Engine requires at least one worker")]
    NoWorkers,

    /// A worker reported a fatal record
    #[error("Run aborted: {0}")]
    Fatal(#[from] Fatal),

    /// The producer returned an error
    #[error("Producer failed: {0}")]
    Producer(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The producer thread panicked
    #[error("Producer thread panicked")]
    ProducerPanicked,

    /// A worker thread panicked
    #[error("Worker {id} panicked")]
    WorkerPanicked { id: usize },

    /// An engine thread could not be started
    #[error("Failed to spawn {role} thread: {reason}")]
    Spawn { role: String, reason: String },
}

/// Returned by `Emitter::emit` once no worker can take more items
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Work handoff closed: no worker is accepting items")]
pub struct HandoffClosed;

/// Manifest encoding/decoding errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest bytes are not a JSON object of strings
    #[error("Failed to parse manifest: {0}")]
    Parse(#[source] serde_json::Error),

    /// Manifest could not be serialized
    #[error("Failed to encode manifest: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Key storage errors
#[derive(Error, Debug)]
pub enum KeyError {
    /// Reading or writing the key file failed
    #[error("Key file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The key file is not a PEM block
    #[error("Key could not be decoded as PEM")]
    InvalidPem,

    /// The PEM block carries a different type label
    #[error("Key could not be loaded as an ed25519 key: unexpected PEM label '{found}'")]
    WrongLabel { found: String },

    /// The PEM payload is not a 64-byte keypair
    #[error("Key could not be loaded as an ed25519 key: expected 64 bytes, found {len}")]
    InvalidLength { len: usize },

    /// The keypair bytes are inconsistent
    #[error("Key could not be loaded as an ed25519 key: {0}")]
    InvalidKey(String),
}

/// Signed container errors
#[derive(Error, Debug)]
pub enum SignatureError {
    /// No newline separates the signature line from the payload
    #[error("Signed file has no signature line")]
    MissingSeparator,

    /// The signature line is not hex
    #[error("Signature is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The decoded signature has the wrong length
    #[error("Signature must be 64 bytes, found {len}")]
    InvalidLength { len: usize },

    /// The signature does not match the payload
    #[error("Signature could not be verified on file")]
    Mismatch,
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Build mode needs a directory
    #[error("No directory specified with flag -d")]
    MissingDirectory,

    /// The default key path needs $HOME
    #[error("Cannot resolve default key path: HOME is not set")]
    NoHomeDirectory,
}

/// Result type alias for VerifierError
pub type Result<T> = std::result::Result<T, VerifierError>;
