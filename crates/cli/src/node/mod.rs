//! Node orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::Node;
pub use stats::NodeStats;
