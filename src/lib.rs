//! dir-verifier - Signed Directory Manifests
//!
//! Computes SHA-256 digests for every file under a directory, bundles them
//! into a JSON manifest signed with a local Ed25519 key, and later re-hashes
//! the files to report anything that changed.
//!
//! # Features
//!
//! - **Parallel Hashing**: A fixed pool of worker threads hashes files while
//!   the directory walk is still running.
//!
//! - **Backpressure**: Work is handed to workers over a zero-capacity
//!   channel, so the walker never runs ahead of the hashers.
//!
//! - **Deterministic Output**: The walk is lexically ordered and manifests are
//!   encoded with sorted keys, so an unchanged tree produces identical bytes.
//!
//! - **Failures as Data**: A file that cannot be read never aborts a run; its
//!   error text is recorded and reported next to the mismatches.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Work Engine                              │
//! │                                                                  │
//! │  ┌────────────┐  bounded(0)  ┌─────────┐ ┌─────────┐ ┌─────────┐ │
//! │  │  Producer  │─────────────►│Worker 1 │ │Worker 2 │ │Worker N │ │
//! │  │ tree walk  │              │ SHA-256 │ │ SHA-256 │ │ SHA-256 │ │
//! │  │ or manifest│              └────┬────┘ └────┬────┘ └────┬────┘ │
//! │  └────────────┘                   └───────────┼───────────┘      │
//! │                                               │ unbounded        │
//! │                                               ▼                  │
//! │                                   ┌──────────────────────┐       │
//! │                                   │      Aggregator      │       │
//! │                                   │ sole owner of the map│       │
//! │                                   └──────────┬───────────┘       │
//! └──────────────────────────────────────────────┼───────────────────┘
//!                                                ▼
//!                        Manifest ──► Ed25519 seal ──► verify.vf
//!                        MismatchReport ──► exit status
//! ```
//!
//! # Example
//!
//! ```bash
//! # Hash the current directory into ./verify.vf
//! dir-verifier -d .
//!
//! # Later, check nothing changed
//! dir-verifier -v
//! ```

pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod progress;
pub mod signing;
pub mod walker;

pub use config::{CliArgs, Mode, RunConfig};
pub use error::{Result, VerifierError};
pub use manifest::{build_manifest, verify_manifest, BuildConfig, Manifest, MismatchReport, VerifyConfig};
pub use signing::{Ed25519KeyStore, Signer};
