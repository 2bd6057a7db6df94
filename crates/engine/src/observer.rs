//! Observer - injected lifecycle and failure hooks
//!
//! Orchestrators never return inner-stage errors to their caller. They
//! report them here instead. The default observer only logs; callers that
//! need strict failure detection install a [`ChannelObserver`].

use std::sync::Arc;

use contracts::PipelineError;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Lifecycle hooks called by `Pipeline` and `Parallel`
pub trait Observer: Send + Sync {
    /// A stage task was spawned
    fn stage_started(&self, _stage: &str) {}

    /// A stage task returned (after any failure was reported)
    fn stage_finished(&self, _stage: &str) {}

    /// A stage returned an error
    fn stage_failed(&self, stage: &str, error: PipelineError);
}

/// Shared observer handle
pub type SharedObserver = Arc<dyn Observer>;

/// Default observer: structured `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn stage_started(&self, stage: &str) {
        debug!(stage = %stage, "Stage started");
    }

    fn stage_finished(&self, stage: &str) {
        debug!(stage = %stage, "Stage finished");
    }

    fn stage_failed(&self, stage: &str, error: PipelineError) {
        error!(stage = %stage, error = %error, "Stage failed");
    }
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn stage_failed(&self, _stage: &str, _error: PipelineError) {}
}

/// A failure forwarded by [`ChannelObserver`]
#[derive(Debug)]
pub struct StageFailure {
    pub stage: String,
    pub error: PipelineError,
}

/// Logs like [`TracingObserver`] and forwards every failure over a channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<StageFailure>,
}

impl ChannelObserver {
    /// Create the observer and the receiving end of its failure channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StageFailure>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Observer for ChannelObserver {
    fn stage_started(&self, stage: &str) {
        TracingObserver.stage_started(stage);
    }

    fn stage_finished(&self, stage: &str) {
        TracingObserver.stage_finished(stage);
    }

    fn stage_failed(&self, stage: &str, error: PipelineError) {
        error!(stage = %stage, error = %error, "Stage failed");
        let failure = StageFailure {
            stage: stage.to_string(),
            error,
        };
        if self.tx.send(failure).is_err() {
            warn!(stage = %stage, "Failure receiver dropped");
        }
    }
}

pub(crate) fn default_observer() -> SharedObserver {
    Arc::new(TracingObserver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_forwards_failures() {
        let (observer, mut rx) = ChannelObserver::new();
        observer.stage_started("s");
        observer.stage_failed("s", PipelineError::stage("s", "boom"));
        observer.stage_finished("s");

        let failure = rx.try_recv().unwrap();
        assert_eq!(failure.stage, "s");
        assert!(matches!(failure.error, PipelineError::Stage { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.stage_failed("s", PipelineError::Cancelled);
    }
}
