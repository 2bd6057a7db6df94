//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{Orchestrator, PipelineConfig};
pub use stats::PipelineStats;
