//! State module for tracking a scrape run
//!
//! # Components
//!
//! - `PipelinePhase`: where the coordinator is in its paging/dispatch cycle
//! - `RunState`: counters owned by the coordinator for the duration of one run
//! - `RunStatistics`: the immutable summary handed back when the run ends

mod phase;
mod run_state;

// Re-export main types
pub use phase::PipelinePhase;
pub use run_state::{FailureCounts, FailureKind, RunState, RunStatistics};
