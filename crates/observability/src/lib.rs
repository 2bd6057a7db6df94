//! # Observability
//!
//! 流水线运行时的日志与指标。
//!
//! - 日志统一写到 stderr，stdout 留给 `StdoutSink`
//! - 指标走 `metrics` facade，可选 Prometheus HTTP 导出
//! - `record_*` 由 engine 在消息进出、阶段结束/失败时调用
//!
//! ```ignore
//! observability::init_with_config(
//!     ObservabilityConfig::default().with_metrics_port(9000),
//! )?;
//! observability::record_message_out("word_count");
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_message_in, record_message_out, record_run_duration, record_stage_failure,
    record_stage_finished, record_worker_count, RunningStats, StatsSummary,
};

/// Logging and metrics settings for a pipeline process
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus listener port (None = no exporter)
    pub metrics_port: Option<u16>,
    /// Filter used when `RUST_LOG` is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Compact,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Warnings only, no exporter (tests, benchmarks)
    pub fn quiet() -> Self {
        Self::default().with_level("warn")
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.default_log_level = level.into();
        self
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// one JSON object per event, with thread and source location
    Json,
    Pretty,
    #[default]
    Compact,
}

/// Compact stderr logging at `info`, no exporter
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Install the tracing subscriber and, if configured, the Prometheus exporter
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    let events = match config.log_format {
        LogFormat::Json => fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_writer(std::io::stderr).pretty().boxed(),
        LogFormat::Compact => fmt::layer().with_writer(std::io::stderr).compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(events)
        .try_init()
        .context("tracing subscriber already installed")?;

    if let Some(port) = config.metrics_port {
        install_exporter(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability ready"
    );
    Ok(())
}

/// Install only the Prometheus exporter, for processes that set up tracing themselves
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_exporter(port)
}

fn install_exporter(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("cannot serve pipeline metrics on port {port}"))?;
    tracing::info!(port = port, "Pipeline metrics exported");
    Ok(())
}
