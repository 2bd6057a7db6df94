//! Pipeline 指标收集模块
//!
//! 通过 `metrics` facade 记录消息吞吐、阶段完成与失败、运行耗时。
//! 未安装 recorder 时所有调用均为空操作。

use metrics::{counter, gauge, histogram};

/// 记录进入 pipeline 的消息
pub fn record_message_in(pipeline: &str) {
    counter!(
        "conduit_messages_in_total",
        "pipeline" => pipeline.to_string()
    )
    .increment(1);
}

/// 记录离开 pipeline 的消息
pub fn record_message_out(pipeline: &str) {
    counter!(
        "conduit_messages_out_total",
        "pipeline" => pipeline.to_string()
    )
    .increment(1);
}

/// 记录阶段失败
pub fn record_stage_failure(stage: &str) {
    counter!(
        "conduit_stage_failures_total",
        "stage" => stage.to_string()
    )
    .increment(1);
}

/// 记录阶段结束 (成功或失败)
pub fn record_stage_finished(stage: &str) {
    counter!(
        "conduit_stages_finished_total",
        "stage" => stage.to_string()
    )
    .increment(1);
}

/// 记录一次完整运行的耗时 (秒)
pub fn record_run_duration(pipeline: &str, secs: f64) {
    histogram!(
        "conduit_run_duration_seconds",
        "pipeline" => pipeline.to_string()
    )
    .record(secs);
}

/// 记录 worker 池大小
pub fn record_worker_count(stage: &str, workers: usize) {
    gauge!(
        "conduit_parallel_workers",
        "stage" => stage.to_string()
    )
    .set(workers as f64);
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_empty_summary_display() {
        let stats = RunningStats::default();
        assert_eq!(format!("{}", stats.summary()), "N/A");
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_message_in("p");
        record_message_out("p");
        record_stage_failure("s");
        record_stage_finished("s");
        record_run_duration("p", 0.5);
        record_worker_count("s", 4);
    }
}
