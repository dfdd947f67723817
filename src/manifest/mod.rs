//! Manifest pipelines
//!
//! - [`builder`]: directory tree → [`Manifest`] (path → SHA-256)
//! - [`verifier`]: [`Manifest`] → [`MismatchReport`] (path → what went wrong)
//!
//! Both run on the shared work engine; they differ only in their producer and
//! worker.

pub mod builder;
pub mod format;
pub mod verifier;

pub use builder::{build_manifest, BuildConfig, BuildOutput};
pub use format::{FileCheck, Manifest, MismatchReport};
pub use verifier::{verify_manifest, VerifyConfig, VerifyOutput};
