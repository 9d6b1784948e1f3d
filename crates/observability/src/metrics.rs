//! 采集指标模块
//!
//! `metrics` facade 记录函数，以及在内存中汇总一次运行的聚合器。

use std::collections::BTreeMap;

use contracts::Channel;
use metrics::{counter, gauge, histogram};

/// 记录一帧成功封装
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_frame_sealed;
///
/// let started = std::time::Instant::now();
/// let frame = synchronizer.collect(timeout).await?;
/// record_frame_sealed(frame.frame_number(), started.elapsed().as_secs_f64() * 1000.0);
/// ```
pub fn record_frame_sealed(frame_number: u64, collect_ms: f64) {
    counter!("carla_dataset_frames_sealed_total").increment(1);
    gauge!("carla_dataset_last_frame_number").set(frame_number as f64);
    histogram!("carla_dataset_collect_latency_ms").record(collect_ms);
}

/// 记录不完整帧 (按缺失通道计数)
pub fn record_partial_frame(missing: &[Channel]) {
    counter!("carla_dataset_partial_frames_total").increment(1);
    for channel in missing {
        counter!("carla_dataset_channel_missing_total", "channel" => channel.as_str())
            .increment(1);
    }
}

/// 记录被丢弃的过期样本
pub fn record_stale_discard(channel: Channel) {
    counter!("carla_dataset_stale_samples_total", "channel" => channel.as_str()).increment(1);
}

/// 记录一次 tick
pub fn record_tick(frame_number: u64) {
    counter!("carla_dataset_ticks_total").increment(1);
    gauge!("carla_dataset_world_frame").set(frame_number as f64);
}

/// 记录帧进入录制缓冲区后的深度
pub fn record_frame_buffered(buffered: usize) {
    counter!("carla_dataset_frames_buffered_total").increment(1);
    gauge!("carla_dataset_recorder_buffered").set(buffered as f64);
}

/// 记录一次 flush
pub fn record_flush(frames: usize, artifacts: usize, duration_ms: f64, success: bool) {
    let status = if success { "ok" } else { "error" };
    counter!("carla_dataset_flushes_total", "status" => status).increment(1);
    if success {
        counter!("carla_dataset_frames_flushed_total").increment(frames as u64);
        counter!("carla_dataset_artifacts_written_total").increment(artifacts as u64);
        gauge!("carla_dataset_recorder_buffered").set(0.0);
    }
    histogram!("carla_dataset_flush_duration_ms").record(duration_ms);
}

/// 记录单帧标注框数量
pub fn record_boxes(count: usize) {
    counter!("carla_dataset_annotated_frames_total").increment(1);
    histogram!("carla_dataset_boxes_per_frame").record(count as f64);
}

/// 采集指标聚合器
///
/// 在内存中聚合一次运行的指标，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CollectionMetricsAggregator {
    /// tick 总数
    pub ticks: u64,

    /// 封装成功的帧数
    pub frames_sealed: u64,

    /// 进入录制缓冲区的帧数
    pub frames_recorded: u64,

    /// 不完整帧数
    pub partial_frames: u64,

    /// 丢弃的过期样本数
    pub stale_discarded: u64,

    /// 写出的文件数
    pub artifacts_written: u64,

    /// flush 次数
    pub flushes: u64,

    /// collect 耗时统计 (毫秒)
    pub collect_stats: RunningStats,

    /// flush 耗时统计 (毫秒)
    pub flush_stats: RunningStats,

    /// 每帧标注框数量统计
    pub box_stats: RunningStats,

    /// 各通道缺失次数
    pub missing_counts: BTreeMap<Channel, u64>,
}

impl CollectionMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// tick 完成
    pub fn record_tick(&mut self) {
        self.ticks += 1;
    }

    /// 帧封装完成
    pub fn record_sealed(&mut self, collect_ms: f64) {
        self.frames_sealed += 1;
        self.collect_stats.push(collect_ms);
    }

    /// 帧不完整
    pub fn record_partial(&mut self, missing: &[Channel]) {
        self.partial_frames += 1;
        for channel in missing {
            *self.missing_counts.entry(*channel).or_insert(0) += 1;
        }
    }

    /// 过期样本
    pub fn record_stale(&mut self, count: u64) {
        self.stale_discarded += count;
    }

    /// 帧进入录制缓冲区 (`boxes` 为 None 表示该帧未标注)
    pub fn record_recorded(&mut self, boxes: Option<usize>) {
        self.frames_recorded += 1;
        if let Some(count) = boxes {
            self.box_stats.push(count as f64);
        }
    }

    /// flush 完成
    pub fn record_flush(&mut self, artifacts: usize, duration_ms: f64) {
        self.flushes += 1;
        self.artifacts_written += artifacts as u64;
        self.flush_stats.push(duration_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let attempted = self.frames_sealed + self.partial_frames;
        MetricsSummary {
            ticks: self.ticks,
            frames_sealed: self.frames_sealed,
            frames_recorded: self.frames_recorded,
            partial_frames: self.partial_frames,
            stale_discarded: self.stale_discarded,
            artifacts_written: self.artifacts_written,
            flushes: self.flushes,
            partial_rate: if attempted > 0 {
                self.partial_frames as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            collect_ms: StatsSummary::from(&self.collect_stats),
            flush_ms: StatsSummary::from(&self.flush_stats),
            boxes_per_frame: StatsSummary::from(&self.box_stats),
            channel_missing_counts: self.missing_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub ticks: u64,
    pub frames_sealed: u64,
    pub frames_recorded: u64,
    pub partial_frames: u64,
    pub stale_discarded: u64,
    pub artifacts_written: u64,
    pub flushes: u64,
    pub partial_rate: f64,
    pub collect_ms: StatsSummary,
    pub flush_ms: StatsSummary,
    pub boxes_per_frame: StatsSummary,
    pub channel_missing_counts: BTreeMap<Channel, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Collection Summary ===")?;
        writeln!(f, "Ticks: {}", self.ticks)?;
        writeln!(f, "Frames sealed: {}", self.frames_sealed)?;
        writeln!(f, "Frames recorded: {}", self.frames_recorded)?;
        writeln!(
            f,
            "Partial frames: {} ({:.2}%)",
            self.partial_frames, self.partial_rate
        )?;
        writeln!(f, "Stale samples discarded: {}", self.stale_discarded)?;
        writeln!(
            f,
            "Artifacts written: {} in {} flush(es)",
            self.artifacts_written, self.flushes
        )?;
        writeln!(f, "Collect latency (ms): {}", self.collect_ms)?;
        writeln!(f, "Flush duration (ms): {}", self.flush_ms)?;
        writeln!(f, "Boxes per annotated frame: {}", self.boxes_per_frame)?;

        if !self.channel_missing_counts.is_empty() {
            writeln!(f, "Missing channel counts:")?;
            for (channel, count) in &self.channel_missing_counts {
                writeln!(f, "  {}: {}", channel, count)?;
            }
        }

        Ok(())
    }
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
            self.m2 += delta * (value - self.mean);
        }
    }

    /// 样本数量
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

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
