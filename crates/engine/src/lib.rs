//! # Engine
//!
//! 流水线调度核心。
//!
//! 负责：
//! - `Pipeline`: 按顺序串联 stage，每一跳一个 pipe
//! - `Parallel`: fan-out / fan-in worker 池
//! - `Debounce`: 每条消息固定延迟后转发
//! - 取消传播与有序关闭

pub mod debounce;
mod ext;
mod forward;
pub mod metrics;
pub mod observer;
pub mod parallel;
pub mod pipeline;
mod shutdown;

#[cfg(test)]
mod testing;

pub use contracts::{stage_fn, CancellationToken, Message, Payload, Pipe, PipelineError, Stage};
pub use debounce::Debounce;
pub use ext::StageExt;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use observer::{
    ChannelObserver, NoopObserver, Observer, SharedObserver, StageFailure, TracingObserver,
};
pub use parallel::Parallel;
pub use pipeline::Pipeline;
pub use shutdown::DEFAULT_SHUTDOWN_GRACE;
