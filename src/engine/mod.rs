//! Generic parallel work engine
//!
//! Decouples work discovery (a producer), parallel execution (a fixed pool of
//! workers) and result aggregation (a single aggregator that owns the output
//! mapping). Both the manifest builder and the manifest verifier are thin
//! configurations of this engine.

pub mod pool;
pub mod types;

pub use pool::{run, Emitter, EngineConfig};
pub use types::{EngineStats, Outcome, ResultMapping, ResultRecord, WorkItem};
