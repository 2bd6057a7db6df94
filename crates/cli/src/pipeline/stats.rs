//! Pipeline statistics.

use std::time::Duration;

use engine::MetricsSnapshot;

/// Statistics from a script run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Messages that entered the processing stages
    pub messages_in: u64,

    /// Messages that left the processing stages
    pub messages_out: u64,

    /// Number of configured processing stages
    pub stages: usize,

    /// Stage failures reported during the run (`stage: error`)
    pub failures: Vec<String>,

    /// Total duration of the run
    pub duration: Duration,

    /// The run was cancelled by its timeout
    pub timed_out: bool,

    /// The run was cancelled by a shutdown signal
    pub interrupted: bool,
}

impl PipelineStats {
    pub fn from_snapshot(snapshot: MetricsSnapshot, stages: usize) -> Self {
        Self {
            messages_in: snapshot.messages_in,
            messages_out: snapshot.messages_out,
            stages,
            ..Default::default()
        }
    }

    /// Output messages per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.messages_out as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of input messages that did not come out, as percentage
    pub fn drop_rate(&self) -> f64 {
        if self.messages_in == 0 {
            return 0.0;
        }
        let dropped = self.messages_in.saturating_sub(self.messages_out);
        (dropped as f64 / self.messages_in as f64) * 100.0
    }

    /// Print detailed summary on stderr (stdout may carry pipeline output)
    pub fn print_summary(&self) {
        eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
        eprintln!("║                    Pipeline Statistics                       ║");
        eprintln!("╚══════════════════════════════════════════════════════════════╝\n");

        eprintln!("📊 Overview");
        eprintln!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        eprintln!("   ├─ Stages: {}", self.stages);
        eprintln!("   ├─ Messages in: {}", self.messages_in);
        eprintln!("   ├─ Messages out: {}", self.messages_out);
        eprintln!("   ├─ Not emitted: {:.2}%", self.drop_rate());
        eprintln!("   └─ Throughput: {:.2} msg/s", self.throughput());

        if self.timed_out {
            eprintln!("\n⏱  Stopped by timeout");
        }
        if self.interrupted {
            eprintln!("\n✋ Stopped by shutdown signal");
        }

        if !self.failures.is_empty() {
            eprintln!("\n⚠️  Stage Failures ({})", self.failures.len());
            for failure in &self.failures {
                eprintln!("   ├─ {}", failure);
            }
        }

        eprintln!();
    }
}
