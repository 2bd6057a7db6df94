//! Script - fluent pipeline builder
//!
//! A script is `source -> stages -> sink`. By default it reads lines from
//! stdin and writes lines to stdout.
//!
//! ```ignore
//! let upper = transform(|s: String| s.to_uppercase());
//! let text = Script::new()
//!     .file_in("input.txt")
//!     .parallel(upper, 4)
//!     .to_text(&CancellationToken::new())
//!     .await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{CancellationToken, Message, Pipe, Result, Stage};
use engine::{Debounce, MetricsSnapshot, Parallel, Pipeline, SharedObserver, TracingObserver};
use tracing::{debug, info, instrument};

use crate::codec::{BlobCodec, CsvCodec, JsonCodec, LineCodec, WriteCodec};
use crate::collect::Collector;
use crate::file::{FileSink, FileSource};
use crate::stdio::{StdinSource, StdoutSink};

const DEFAULT_NAME: &str = "script";

/// Fluent builder over [`Pipeline`]
pub struct Script {
    name: String,
    input: Arc<dyn Stage>,
    output: Arc<dyn Stage>,
    stages: Vec<Arc<dyn Stage>>,
    capacity: usize,
    observer: SharedObserver,
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script")
            .field("name", &self.name)
            .field("input", &self.input.name())
            .field(
                "stages",
                &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("output", &self.output.name())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Script {
    pub fn new() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            input: Arc::new(StdinSource::new(LineCodec)),
            output: Arc::new(StdoutSink::new(LineCodec)),
            stages: Vec::new(),
            capacity: 1,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the source stage
    pub fn input(mut self, source: impl Stage + 'static) -> Self {
        self.input = Arc::new(source);
        self
    }

    /// Replace the sink stage
    pub fn output(mut self, sink: impl Stage + 'static) -> Self {
        self.output = Arc::new(sink);
        self
    }

    /// Read lines from `path`
    pub fn file_in(self, path: impl Into<PathBuf>) -> Self {
        self.input(FileSource::new(path, LineCodec))
    }

    /// Write lines to `path`, truncating it
    pub fn file_out(self, path: impl Into<PathBuf>) -> Self {
        self.output(FileSink::new(path, LineCodec))
    }

    /// Read a JSON document from `path`; a top-level array yields one message per element
    pub fn json_in(self, path: impl Into<PathBuf>) -> Self {
        self.input(FileSource::new(path, JsonCodec::default()))
    }

    /// Write every message to `path` as one JSON array
    pub fn json_out(self, path: impl Into<PathBuf>) -> Self {
        self.output(FileSink::new(path, JsonCodec::array()))
    }

    /// Read the whole of `path` as one text message
    pub fn blob_in(self, path: impl Into<PathBuf>) -> Self {
        self.input(FileSource::new(path, BlobCodec::text()))
    }

    /// Write payloads to `path` back to back
    pub fn blob_out(self, path: impl Into<PathBuf>) -> Self {
        self.output(FileSink::new(path, BlobCodec::default()))
    }

    /// Read CSV rows from `path`, one `Json` array message per row
    pub fn csv_in(self, path: impl Into<PathBuf>) -> Self {
        self.input(FileSource::new(path, CsvCodec::new()))
    }

    /// Write every message to `path` as a CSV row
    pub fn csv_out(self, path: impl Into<PathBuf>) -> Self {
        self.output(FileSink::new(path, CsvCodec::new()))
    }

    /// Append a processing stage
    pub fn chain(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Append `stage` running on `workers` concurrent workers
    pub fn parallel(self, stage: impl Stage + 'static, workers: usize) -> Self {
        let parallel = Parallel::new(stage, workers)
            .with_capacity(self.capacity)
            .with_observer(Arc::clone(&self.observer));
        self.chain(parallel)
    }

    /// Append a fixed per-message delay
    pub fn debounce(self, delay: Duration) -> Self {
        self.chain(Debounce::new(delay))
    }

    /// Capacity of every pipe created from here on
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run source, stages and sink to completion
    ///
    /// Returns the message counts of the processing stages.
    pub async fn run(&self, ctx: &CancellationToken) -> Result<MetricsSnapshot> {
        self.execute(ctx, Arc::clone(&self.output)).await
    }

    /// Run with every output message collected in memory instead of the sink
    pub async fn collect(&self, ctx: &CancellationToken) -> Result<Vec<Message>> {
        let (collector, handle) = Collector::new();
        self.execute(ctx, Arc::new(collector)).await?;
        Ok(handle.take().await)
    }

    /// Run and render the output as newline-terminated lines
    ///
    /// Every payload is followed by `\n`, including the last one; payloads are
    /// never concatenated directly. Use [`Script::collect`] for other framing.
    pub async fn to_text(&self, ctx: &CancellationToken) -> Result<String> {
        let messages = self.collect(ctx).await?;
        let mut codec = LineCodec;
        let mut buf: Vec<u8> = Vec::new();
        for msg in &messages {
            codec.encode(msg, &mut buf).await?;
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    #[instrument(name = "script_run", skip_all, fields(script = %self.name, stages = self.stages.len()))]
    async fn execute(
        &self,
        ctx: &CancellationToken,
        output: Arc<dyn Stage>,
    ) -> Result<MetricsSnapshot> {
        let started = Instant::now();

        let inner = self.stages.iter().fold(
            Pipeline::new()
                .with_name(self.name.clone())
                .with_capacity(self.capacity)
                .with_observer(Arc::clone(&self.observer)),
            |pipeline, stage| pipeline.chain(Arc::clone(stage)),
        );
        let metrics = Arc::clone(inner.metrics());

        let outer = Pipeline::new()
            .with_name(format!("{}_io", self.name))
            .with_capacity(self.capacity)
            .with_observer(Arc::clone(&self.observer))
            .chain(Arc::clone(&self.input))
            .chain(inner)
            .chain(output);

        // the source ignores its inbound, so the external inbound starts closed
        let ext = Pipe::with_capacity(self.capacity);
        ext.inbound().close();
        let drain = async {
            let mut leftover = 0u64;
            while ext.outbound().recv().await.is_some() {
                leftover += 1;
            }
            leftover
        };
        let (result, leftover) = tokio::join!(outer.start(ctx, ext.clone()), drain);
        result?;
        if leftover > 0 {
            debug!(leftover, "Discarded messages emitted by the sink");
        }

        let elapsed = started.elapsed();
        observability::record_run_duration(&self.name, elapsed.as_secs_f64());

        let snapshot = metrics.snapshot();
        info!(
            messages_in = snapshot.messages_in,
            messages_out = snapshot.messages_out,
            stage_failures = snapshot.stage_failures,
            elapsed_ms = elapsed.as_millis() as u64,
            "Script finished"
        );
        Ok(snapshot)
    }
}

/// Read the whole of `path` as text
pub async fn read_file(ctx: &CancellationToken, path: impl Into<PathBuf>) -> Result<String> {
    let messages = Script::new().blob_in(path).collect(ctx).await?;
    Ok(messages
        .into_iter()
        .filter_map(|m| m.payload::<String>())
        .collect())
}
