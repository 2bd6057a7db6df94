//! Decorator helpers available on every stage

use std::sync::Arc;
use std::time::Duration;

use contracts::Stage;

use crate::{Debounce, Parallel, Pipeline, SharedObserver};

pub trait StageExt: Stage + Sized + 'static {
    /// Run this stage on `workers` concurrent workers
    fn parallel(self, workers: usize) -> Parallel {
        Parallel::new(self, workers)
    }

    /// Like [`StageExt::parallel`], reporting worker failures to `observer`
    fn parallel_with(self, workers: usize, observer: SharedObserver) -> Parallel {
        Parallel::new(self, workers).with_observer(observer)
    }

    /// Delay every message by `delay` before it reaches this stage
    fn debounced(self, delay: Duration) -> Pipeline {
        let name = format!("debounced({})", self.name());
        Pipeline::new()
            .with_name(name)
            .chain(Debounce::new(delay))
            .chain(self)
    }

    /// Like [`StageExt::debounced`], with the wrapper pipeline reporting to `observer`
    fn debounced_with(self, delay: Duration, observer: SharedObserver) -> Pipeline {
        self.debounced(delay).with_observer(observer)
    }

    fn shared(self) -> Arc<dyn Stage> {
        Arc::new(self)
    }
}

impl<S: Stage + Sized + 'static> StageExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ChannelObserver;
    use crate::testing::*;
    use contracts::CancellationToken;
    use tokio::time::Instant;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_helper() {
        let stage = slow_double(Duration::ZERO).parallel(3);
        assert_eq!(stage.workers(), 3);

        let out = drive(&stage, CancellationToken::new(), ints(20)).await;
        let mut values: Vec<i64> = out.iter().filter_map(|m| m.payload::<i64>()).collect();
        values.sort_unstable();
        assert_eq!(values, (0..20).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_debounced_helper() {
        let stage = map_text("upper", |s| s.to_uppercase()).debounced(Duration::from_millis(20));
        assert_eq!(stage.name(), "debounced(upper)");

        let started = Instant::now();
        let out = drive(&stage, CancellationToken::new(), texts(&["a", "b"])).await;
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(payload_texts(&out), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_shared_stage_chains_twice() {
        let upper = map_text("upper", |s| s.to_uppercase()).shared();
        let pipeline = Pipeline::new()
            .chain(Arc::clone(&upper))
            .chain(upper);

        let out = drive(&pipeline, CancellationToken::new(), texts(&["a"])).await;
        assert_eq!(payload_texts(&out), vec!["A"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_with_reports_to_enclosing_observer() {
        let (observer, mut failures) = ChannelObserver::new();
        let observer: SharedObserver = Arc::new(observer);
        let pipeline = Pipeline::new()
            .with_observer(Arc::clone(&observer))
            .chain(failing("broken").parallel_with(2, observer));

        let out = tokio::time::timeout(
            Duration::from_secs(2),
            drive(&pipeline, CancellationToken::new(), ints(3)),
        )
        .await
        .expect("pool of failed workers should drain");

        assert!(out.is_empty());
        let mut seen = 0;
        while let Ok(failure) = failures.try_recv() {
            assert_eq!(failure.stage, "broken");
            seen += 1;
        }
        assert_eq!(seen, 2);
    }

    #[tokio::test]
    async fn test_debounced_with_reports_to_enclosing_observer() {
        let (observer, mut failures) = ChannelObserver::new();
        let observer: SharedObserver = Arc::new(observer);
        let pipeline = Pipeline::new()
            .with_observer(Arc::clone(&observer))
            .chain(failing("broken").debounced_with(Duration::from_millis(1), observer));

        let out = tokio::time::timeout(
            Duration::from_secs(2),
            drive(&pipeline, CancellationToken::new(), texts(&["a"])),
        )
        .await
        .expect("failed stage inside the wrapper should drain");

        assert!(out.is_empty());
        let failure = failures.try_recv().expect("failure must reach the channel");
        assert_eq!(failure.stage, "broken");
        assert!(failures.try_recv().is_err());
    }
}
