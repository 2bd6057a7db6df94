//! Parallel - fan-out / fan-in worker pool
//!
//! One inbound stream is spread round-robin over `workers` copies of an inner
//! stage, each on its own sub-pipe. Their outputs are merged back into the
//! parent outbound queue. Output order is not preserved.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{CancellationToken, Message, Pipe, Queue, Result, Stage, TrySendError};
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, trace};

use crate::observer::{default_observer, SharedObserver};
use crate::shutdown::{is_shutdown_error, join_with_grace, DEFAULT_SHUTDOWN_GRACE};

/// Worker pool decorator
pub struct Parallel {
    name: String,
    inner: Arc<dyn Stage>,
    workers: usize,
    capacity: usize,
    observer: SharedObserver,
    shutdown_grace: Duration,
}

impl std::fmt::Debug for Parallel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parallel")
            .field("name", &self.name)
            .field("workers", &self.workers)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Parallel {
    /// Run `inner` on `workers` concurrent workers (minimum 1)
    pub fn new(inner: impl Stage + 'static, workers: usize) -> Self {
        Self::shared(Arc::new(inner), workers)
    }

    /// Same as [`Parallel::new`] for an already shared stage
    pub fn shared(inner: Arc<dyn Stage>, workers: usize) -> Self {
        Self {
            name: format!("parallel({})", inner.name()),
            inner,
            workers: workers.max(1),
            capacity: 1,
            observer: default_observer(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Capacity of each worker sub-pipe (minimum 1)
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Time workers get to exit after cancellation before being aborted
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

#[async_trait]
impl Stage for Parallel {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "parallel_run",
        skip(self, ctx, pipe),
        fields(stage = %self.name, workers = self.workers)
    )]
    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        let scope = ctx.child_token();
        let _guard = scope.clone().drop_guard();
        observability::record_worker_count(&self.name, self.workers);

        let subpipes: Vec<Pipe> = (0..self.workers)
            .map(|_| Pipe::with_capacity(self.capacity))
            .collect();

        let mut workers = JoinSet::new();
        for (idx, sp) in subpipes.iter().enumerate() {
            let inner = Arc::clone(&self.inner);
            let observer = Arc::clone(&self.observer);
            let ctx = scope.clone();
            let sp = sp.clone();
            workers.spawn(async move {
                let name = inner.name().to_string();
                if let Err(e) = inner.run(ctx.clone(), sp.clone()).await {
                    if !is_shutdown_error(&e, &ctx) {
                        observability::record_stage_failure(&name);
                        observer.stage_failed(&name, e);
                    }
                }
                // the fan-in task for this worker must always see a close
                sp.close();
                trace!(stage = %name, worker = idx, "Worker exited");
            });
        }

        // JoinSet doubles as the wait group over fan-in tasks
        let mut fan_in = JoinSet::new();
        for sp in &subpipes {
            let from = sp.outbound().clone();
            let to = pipe.outbound().clone();
            let ctx = scope.clone();
            fan_in.spawn(async move {
                while let Some(msg) = from.recv_until(&ctx).await {
                    if to.send_until(&ctx, msg).await.is_err() {
                        break;
                    }
                }
            });
        }

        let fan_out = tokio::spawn(fan_out(
            scope.clone(),
            pipe.inbound().clone(),
            subpipes.clone(),
        ));

        while let Some(res) = fan_in.join_next().await {
            if let Err(e) = res {
                error!(stage = %self.name, error = ?e, "Fan-in task panicked");
            }
        }
        pipe.close();
        debug!(stage = %self.name, "Fan-in drained, pipe closed");

        scope.cancel();
        for sp in &subpipes {
            sp.inbound().close();
            sp.outbound().close();
        }
        if let Err(e) = fan_out.await {
            error!(stage = %self.name, error = ?e, "Fan-out task panicked");
        }
        join_with_grace(&mut workers, self.shutdown_grace, &self.name).await;
        Ok(())
    }
}

/// Distribute `input` round-robin over `subpipes` with non-blocking sends
///
/// The index advances on every attempt. After a full sweep of refused sends
/// the task yields before retrying. Every sub-pipe inbound is closed on exit.
async fn fan_out(ctx: CancellationToken, input: Queue, subpipes: Vec<Pipe>) {
    let n = subpipes.len();
    let mut next = 0usize;
    let mut sent = 0u64;

    'messages: while let Some(msg) = input.recv_until(&ctx).await {
        let mut pending: Message = msg;
        let mut misses = 0usize;
        loop {
            let target = subpipes[next].inbound();
            next = (next + 1) % n;
            match target.try_send(pending) {
                Ok(()) => break,
                Err(TrySendError::Full(m)) | Err(TrySendError::Closed(m)) => {
                    pending = m;
                    misses += 1;
                    if misses % n == 0 {
                        if ctx.is_cancelled() {
                            break 'messages;
                        }
                        tokio::task::yield_now().await;
                    }
                }
            }
        }

        sent += 1;
        if sent.is_multiple_of(100) {
            debug!(sent = sent, "Fan-out progress");
        }
    }

    for sp in &subpipes {
        sp.inbound().close();
    }
}
