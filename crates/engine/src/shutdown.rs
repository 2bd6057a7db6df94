//! Bounded task shutdown shared by `Pipeline` and `Parallel`

use std::time::Duration;

use contracts::{CancellationToken, PipelineError};
use tokio::task::JoinSet;
use tracing::{error, warn};

/// How long cancelled tasks get to exit before they are aborted
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Join every task in `tasks`, aborting whatever is still running after `grace`
///
/// Returns the number of tasks that had to be aborted.
pub(crate) async fn join_with_grace(
    tasks: &mut JoinSet<()>,
    grace: Duration,
    owner: &str,
) -> usize {
    let drained = tokio::time::timeout(grace, async {
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                error!(owner = %owner, error = ?e, "Task panicked");
            }
        }
    })
    .await;

    if drained.is_ok() {
        return 0;
    }

    let stragglers = tasks.len();
    warn!(
        owner = %owner,
        stragglers = stragglers,
        grace_ms = grace.as_millis() as u64,
        "Tasks ignored cancellation, aborting"
    );
    tasks.shutdown().await;
    stragglers
}

/// Errors a stage returns only because its context was torn down
pub(crate) fn is_shutdown_error(error: &PipelineError, ctx: &CancellationToken) -> bool {
    error.is_cancelled() || (ctx.is_cancelled() && matches!(error, PipelineError::ChannelClosed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finished_tasks_are_not_aborted() {
        let mut tasks = JoinSet::new();
        for _ in 0..3 {
            tasks.spawn(async {});
        }
        let aborted = join_with_grace(&mut tasks, Duration::from_millis(100), "t").await;
        assert_eq!(aborted, 0);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn test_stuck_task_is_aborted_after_grace() {
        let mut tasks = JoinSet::new();
        tasks.spawn(async {});
        tasks.spawn(std::future::pending::<()>());

        let aborted = tokio::time::timeout(
            Duration::from_secs(2),
            join_with_grace(&mut tasks, Duration::from_millis(50), "t"),
        )
        .await
        .expect("grace period must bound the join");
        assert_eq!(aborted, 1);
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_shutdown_error_classification() {
        let ctx = CancellationToken::new();
        assert!(is_shutdown_error(&PipelineError::Cancelled, &ctx));
        assert!(!is_shutdown_error(&PipelineError::ChannelClosed, &ctx));

        ctx.cancel();
        assert!(is_shutdown_error(&PipelineError::ChannelClosed, &ctx));
        assert!(!is_shutdown_error(&PipelineError::stage("s", "boom"), &ctx));
    }
}
