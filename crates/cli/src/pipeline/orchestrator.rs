//! Script orchestrator - turns a blueprint into a running `Script`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{
    CancellationToken, CodecKind, ScriptBlueprint, SinkConfig, SinkKind, SourceConfig,
    SourceKind, Stage,
};
use engine::{ChannelObserver, SharedObserver, StageExt};
use routines::{
    build_op, BlobCodec, CsvCodec, FileMode, FileSink, FileSource, JsonCodec, LineCodec, Script,
    StdinSource, StdoutSink,
};
use tracing::{info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The script blueprint
    pub blueprint: ScriptBlueprint,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Builds and runs a script from its blueprint
pub struct Orchestrator {
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Assemble the script: source, stages with their decorators, sink
    pub fn build_script(&self, observer: SharedObserver) -> Result<Script, CliError> {
        let blueprint = &self.config.blueprint;

        let mut script = Script::new()
            .with_name("conduit")
            .with_capacity(blueprint.runtime.channel_capacity)
            .with_observer(Arc::clone(&observer))
            .input(source_stage(&blueprint.source)?)
            .output(sink_stage(&blueprint.sink)?);

        for config in &blueprint.stages {
            let mut stage = build_op(config);
            if let Some(ms) = config.debounce_ms {
                let delay = Duration::from_millis(ms);
                stage = Arc::new(stage.debounced_with(delay, Arc::clone(&observer)));
            }
            script = match config.parallel {
                Some(workers) => script.parallel(stage, workers),
                None => script.chain(stage),
            };
        }

        Ok(script)
    }

    /// Run the script until its source is exhausted or `ctx` is cancelled
    pub async fn run(self, ctx: CancellationToken) -> Result<PipelineStats> {
        let started = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let (observer, mut failures) = ChannelObserver::new();
        let script = self.build_script(Arc::new(observer))?;
        info!(script = ?script, "Script assembled");

        let run = script.run(&ctx);
        tokio::pin!(run);

        let mut timed_out = false;
        let snapshot = match self.config.timeout {
            Some(limit) => tokio::select! {
                res = &mut run => res?,
                _ = tokio::time::sleep(limit) => {
                    warn!(timeout_secs = limit.as_secs(), "Script timed out, cancelling");
                    timed_out = true;
                    ctx.cancel();
                    run.await?
                }
            },
            None => run.await?,
        };

        let mut stats = PipelineStats::from_snapshot(snapshot, self.config.blueprint.stages.len());
        while let Ok(failure) = failures.try_recv() {
            stats
                .failures
                .push(format!("{}: {}", failure.stage, failure.error));
        }
        stats.timed_out = timed_out;
        stats.interrupted = ctx.is_cancelled() && !timed_out;
        stats.duration = started.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            throughput = format!("{:.2}", stats.throughput()),
            failures = stats.failures.len(),
            "Script finished"
        );

        Ok(stats)
    }
}

fn source_stage(config: &SourceConfig) -> Result<Arc<dyn Stage>, CliError> {
    let stage: Arc<dyn Stage> = match config.kind {
        SourceKind::Stdin => match config.codec {
            CodecKind::Lines => Arc::new(StdinSource::new(LineCodec)),
            CodecKind::Json => Arc::new(StdinSource::new(JsonCodec::default())),
            CodecKind::JsonLines => Arc::new(StdinSource::new(JsonCodec::lines())),
            CodecKind::JsonArray => Arc::new(StdinSource::new(JsonCodec::array())),
            CodecKind::Blob => Arc::new(StdinSource::new(BlobCodec::text())),
            CodecKind::Csv => Arc::new(StdinSource::new(CsvCodec::new())),
        },
        SourceKind::File => {
            let path = config
                .path
                .clone()
                .ok_or_else(|| CliError::missing_path("source.path"))?;
            match config.codec {
                CodecKind::Lines => Arc::new(FileSource::new(path, LineCodec)),
                CodecKind::Json => Arc::new(FileSource::new(path, JsonCodec::default())),
                CodecKind::JsonLines => Arc::new(FileSource::new(path, JsonCodec::lines())),
                CodecKind::JsonArray => Arc::new(FileSource::new(path, JsonCodec::array())),
                CodecKind::Blob => Arc::new(FileSource::new(path, BlobCodec::text())),
                CodecKind::Csv => Arc::new(FileSource::new(path, CsvCodec::new())),
            }
        }
    };
    Ok(stage)
}

fn sink_stage(config: &SinkConfig) -> Result<Arc<dyn Stage>, CliError> {
    let stage: Arc<dyn Stage> = match config.kind {
        SinkKind::Stdout => match config.codec {
            CodecKind::Lines => Arc::new(StdoutSink::new(LineCodec)),
            CodecKind::Json | CodecKind::JsonLines => Arc::new(StdoutSink::new(JsonCodec::lines())),
            CodecKind::JsonArray => Arc::new(StdoutSink::new(JsonCodec::array())),
            CodecKind::Blob => Arc::new(StdoutSink::new(BlobCodec::default())),
            CodecKind::Csv => Arc::new(StdoutSink::new(CsvCodec::new())),
        },
        SinkKind::File => {
            let path = config
                .path
                .clone()
                .ok_or_else(|| CliError::missing_path("sink.path"))?;
            let mode = if config.append {
                FileMode::Append
            } else {
                FileMode::Truncate
            };
            match config.codec {
                CodecKind::Lines => Arc::new(FileSink::new(path, LineCodec).with_mode(mode)),
                CodecKind::Json | CodecKind::JsonLines => {
                    Arc::new(FileSink::new(path, JsonCodec::lines()).with_mode(mode))
                }
                CodecKind::JsonArray => {
                    Arc::new(FileSink::new(path, JsonCodec::array()).with_mode(mode))
                }
                CodecKind::Blob => Arc::new(FileSink::new(path, BlobCodec::default()).with_mode(mode)),
                CodecKind::Csv => Arc::new(FileSink::new(path, CsvCodec::new()).with_mode(mode)),
            }
        }
    };
    Ok(stage)
}
