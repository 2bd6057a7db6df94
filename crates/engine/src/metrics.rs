//! Pipeline metrics for observability
//!
//! Local atomics for snapshots, mirrored to the `metrics` facade.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single pipeline
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Pipeline name (metric label)
    pipeline: String,
    /// Messages forwarded into the first stage
    messages_in: AtomicU64,
    /// Messages forwarded out of the last stage
    messages_out: AtomicU64,
    /// Stages that returned an error
    stage_failures: AtomicU64,
    /// Stage tasks that returned
    stages_finished: AtomicU64,
}

impl PipelineMetrics {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            ..Self::default()
        }
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    pub fn messages_in(&self) -> u64 {
        self.messages_in.load(Ordering::Relaxed)
    }

    pub fn inc_messages_in(&self) {
        self.messages_in.fetch_add(1, Ordering::Relaxed);
        observability::record_message_in(&self.pipeline);
    }

    pub fn messages_out(&self) -> u64 {
        self.messages_out.load(Ordering::Relaxed)
    }

    pub fn inc_messages_out(&self) {
        self.messages_out.fetch_add(1, Ordering::Relaxed);
        observability::record_message_out(&self.pipeline);
    }

    pub fn stage_failures(&self) -> u64 {
        self.stage_failures.load(Ordering::Relaxed)
    }

    pub fn inc_stage_failures(&self, stage: &str) {
        self.stage_failures.fetch_add(1, Ordering::Relaxed);
        observability::record_stage_failure(stage);
    }

    pub fn stages_finished(&self) -> u64 {
        self.stages_finished.load(Ordering::Relaxed)
    }

    pub fn inc_stages_finished(&self, stage: &str) {
        self.stages_finished.fetch_add(1, Ordering::Relaxed);
        observability::record_stage_finished(stage);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_in: self.messages_in(),
            messages_out: self.messages_out(),
            stage_failures: self.stage_failures(),
            stages_finished: self.stages_finished(),
        }
    }
}

/// Snapshot of pipeline metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_in: u64,
    pub messages_out: u64,
    pub stage_failures: u64,
    pub stages_finished: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = PipelineMetrics::new("p");
        metrics.inc_messages_in();
        metrics.inc_messages_in();
        metrics.inc_messages_out();
        metrics.inc_stage_failures("s");
        metrics.inc_stages_finished("s");

        assert_eq!(metrics.pipeline(), "p");
        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                messages_in: 2,
                messages_out: 1,
                stage_failures: 1,
                stages_finished: 1,
            }
        );
    }
}
