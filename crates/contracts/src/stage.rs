//! Stage trait - the unit of work in a pipeline

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{Pipe, Result};

/// A processing stage
///
/// `run` reads messages from `pipe.inbound()` until it is closed and drained
/// (or `ctx` is cancelled), writes results to `pipe.outbound()`, and must
/// call `pipe.close()` before returning, on every path.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name (used for logging and metrics)
    fn name(&self) -> &str;

    /// Run until input is exhausted or `ctx` is cancelled
    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()>;
}

#[async_trait]
impl<S: Stage + ?Sized> Stage for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        (**self).run(ctx, pipe).await
    }
}

#[async_trait]
impl<S: Stage + ?Sized> Stage for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        (**self).run(ctx, pipe).await
    }
}

/// Stage backed by an async closure
pub struct FnStage<F> {
    name: String,
    f: F,
}

impl<F> std::fmt::Debug for FnStage<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

/// Build a stage from a closure taking `(ctx, pipe)`
pub fn stage_fn<F, Fut>(name: impl Into<String>, f: F) -> FnStage<F>
where
    F: Fn(CancellationToken, Pipe) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnStage {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> Stage for FnStage<F>
where
    F: Fn(CancellationToken, Pipe) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken, pipe: Pipe) -> Result<()> {
        (self.f)(ctx, pipe).await
    }
}
