//! Pipeline - linear stage orchestrator
//!
//! Wires `ext.inbound -> stage 1 -> ... -> stage N -> ext.outbound`, one pipe
//! per hop, every stage in its own task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{CancellationToken, Pipe, Result, Stage};
use tokio::task::JoinSet;
use tracing::{debug, instrument};

use crate::forward::forward;
use crate::metrics::PipelineMetrics;
use crate::observer::{default_observer, SharedObserver};
use crate::shutdown::{is_shutdown_error, join_with_grace, DEFAULT_SHUTDOWN_GRACE};

const DEFAULT_NAME: &str = "pipeline";

/// Ordered chain of stages, itself usable as a stage
pub struct Pipeline {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    capacity: usize,
    observer: SharedObserver,
    metrics: Arc<PipelineMetrics>,
    shutdown_grace: Duration,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field(
                "stages",
                &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("capacity", &self.capacity)
            .field("shutdown_grace", &self.shutdown_grace)
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            stages: Vec::new(),
            capacity: 1,
            observer: default_observer(),
            metrics: Arc::new(PipelineMetrics::new(DEFAULT_NAME)),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Set the pipeline name (also the metrics label)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self.metrics = Arc::new(PipelineMetrics::new(self.name.clone()));
        self
    }

    /// Capacity of each internal pipe (minimum 1)
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Time stage tasks get to exit after cancellation before being aborted
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Append a stage
    pub fn chain(mut self, stage: impl Stage + 'static) -> Self {
        self.push(stage);
        self
    }

    /// Append a stage in place
    pub fn push(&mut self, stage: impl Stage + 'static) {
        self.stages.push(Arc::new(stage));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Run every stage against `pipe` until it is closed
    ///
    /// Returns once `pipe.done()` fires. Stage errors go to the observer and
    /// are never returned. Tasks still running after the shutdown grace
    /// period are aborted, so a stage that ignores `ctx` cannot hold the
    /// caller.
    #[instrument(
        name = "pipeline_start",
        skip(self, ctx, pipe),
        fields(pipeline = %self.name, stages = self.stages.len())
    )]
    pub async fn start(&self, ctx: &CancellationToken, pipe: Pipe) -> Result<()> {
        let ctx = ctx.child_token();
        let _guard = ctx.clone().drop_guard();
        let mut tasks = JoinSet::new();

        // pipes[0] is the head; stage i runs on pipes[i + 1]
        let mut pipes: Vec<Pipe> = (0..=self.stages.len())
            .map(|_| Pipe::with_capacity(self.capacity))
            .collect();
        for i in 0..self.stages.len() {
            let next = pipes[i + 1].clone();
            pipes[i].chain(&next);
        }

        for (stage, stage_pipe) in self.stages.iter().zip(pipes.iter().skip(1)) {
            tasks.spawn(run_stage(
                Arc::clone(stage),
                ctx.clone(),
                stage_pipe.clone(),
                Arc::clone(&self.observer),
                Arc::clone(&self.metrics),
            ));
        }

        let head = pipes[0].clone();
        let metrics = Arc::clone(&self.metrics);
        tasks.spawn(forward(
            ctx.clone(),
            pipe.inbound().clone(),
            head,
            move || metrics.inc_messages_in(),
        ));

        let tail = pipes[self.stages.len()].outbound().clone();
        let metrics = Arc::clone(&self.metrics);
        tasks.spawn(forward(ctx.clone(), tail, pipe.clone(), move || {
            metrics.inc_messages_out()
        }));

        pipe.done().wait().await;
        debug!(pipeline = %self.name, "External pipe closed, stopping stages");

        ctx.cancel();
        // wake stages blocked on a queue without watching ctx
        for p in &pipes {
            p.inbound().close();
            p.outbound().close();
        }
        join_with_grace(&mut tasks, self.shutdown_grace, &self.name).await;

        let snapshot = self.metrics.snapshot();
        debug!(
            pipeline = %self.name,
            messages_in = snapshot.messages_in,
            messages_out = snapshot.messages_out,
            stage_failures = snapshot.stage_failures,
            "Pipeline finished"
        );
        Ok(())
    }
}

/// Run one stage, report the outcome, and close its pipe
async fn run_stage(
    stage: Arc<dyn Stage>,
    ctx: CancellationToken,
    pipe: Pipe,
    observer: SharedObserver,
    metrics: Arc<PipelineMetrics>,
) {
    let name = stage.name().to_string();
    observer.stage_started(&name);

    if let Err(e) = stage.run(ctx.clone(), pipe.clone()).await {
        if !is_shutdown_error(&e, &ctx) {
            metrics.inc_stage_failures(&name);
            observer.stage_failed(&name, e);
        }
    }

    // a failed stage counts as drained
    pipe.close();
    metrics.inc_stages_finished(&name);
    observer.stage_finished(&name);
}

#[async_trait]
impl Stage for Pipeline {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        self.start(&ctx, pipe).await
    }
}
