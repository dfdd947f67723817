//! Content hashing
//!
//! Provides the SHA-256 file digests stored in manifests.

pub mod checksum;

pub use checksum::{is_digest, sha256_file, sha256_hex};
