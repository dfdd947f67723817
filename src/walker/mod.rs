//! Local filesystem walker
//!
//! Feeds the manifest builder with every entry under a root directory in a
//! deterministic order:
//!
//! ```text
//! root/            visited 1st
//! ├── a/           visited 2nd
//! │   ├── 1.txt    visited 3rd
//! │   └── 2.txt    visited 4th
//! └── b.txt        visited 5th
//! ```

pub mod tree;

pub use tree::{walk, WalkAction, WalkSummary};
