//! SensorChannel - bounded hand-off between a producer callback and the collector

use std::sync::Arc;
use std::time::Duration;

use async_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use contracts::{Channel, DropPolicy, Sample};
use metrics::counter;
use tracing::{trace, warn};

use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};

/// Bounded sample queue for one channel
///
/// `push` is called from the simulator's producer thread and never blocks.
/// `pop` is awaited by the collector with a deadline.
#[derive(Debug)]
pub struct SensorChannel {
    channel: Channel,
    tx: Sender<Sample>,
    rx: Receiver<Sample>,
    drop_policy: DropPolicy,
    metrics: Arc<IngestionMetrics>,
}

impl SensorChannel {
    /// Create an empty channel
    pub fn new(channel: Channel, config: &BackpressureConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));
        Self {
            channel,
            tx,
            rx,
            drop_policy: config.drop_policy,
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// Channel kind
    pub fn kind(&self) -> Channel {
        self.channel
    }

    /// Hand a decoded sample to the collector
    ///
    /// When the queue is full the drop policy decides which sample is lost.
    pub fn push(&self, sample: Sample) {
        self.metrics.record_received();
        counter!("carla_dataset_samples_received_total", "channel" => self.channel.as_str())
            .increment(1);

        let mut pending = sample;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => {
                    trace!(channel = %self.channel, "sample queued");
                    break;
                }
                Err(TrySendError::Full(rejected)) => match self.drop_policy {
                    DropPolicy::DropNewest => {
                        self.record_drop(rejected.frame_number, "newest");
                        break;
                    }
                    DropPolicy::DropOldest => {
                        if let Ok(evicted) = self.rx.try_recv() {
                            self.record_drop(evicted.frame_number, "oldest");
                        }
                        pending = rejected;
                    }
                },
                Err(TrySendError::Closed(_)) => {
                    warn!(channel = %self.channel, "channel closed, sample discarded");
                    break;
                }
            }
        }

        self.metrics.update_queue_len(self.tx.len());
    }

    /// Wait up to `timeout` for the next sample
    ///
    /// # Errors
    /// [`IngestionError::ChannelTimeout`] if nothing arrives in time,
    /// [`IngestionError::ChannelClosed`] once the channel is closed and drained.
    pub async fn pop(&self, timeout: Duration) -> Result<Sample> {
        let received = tokio::time::timeout(timeout, self.rx.recv()).await;
        self.metrics.update_queue_len(self.rx.len());

        match received {
            Ok(Ok(sample)) => Ok(sample),
            Ok(Err(_)) => Err(IngestionError::ChannelClosed {
                channel: self.channel,
            }),
            Err(_) => Err(IngestionError::ChannelTimeout {
                channel: self.channel,
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Take a sample if one is already queued
    pub fn try_pop(&self) -> Option<Sample> {
        match self.rx.try_recv() {
            Ok(sample) => Some(sample),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Queued samples
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// No queued samples
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Queue capacity
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }

    /// Close the channel; queued samples can still be drained
    pub fn close(&self) {
        self.tx.close();
    }

    /// Shared metrics
    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    fn record_drop(&self, frame_number: u64, which: &'static str) {
        self.metrics.record_dropped();
        counter!(
            "carla_dataset_samples_dropped_total",
            "channel" => self.channel.as_str(),
            "policy" => which
        )
        .increment(1);
        warn!(channel = %self.channel, frame = frame_number, policy = which, "queue full, sample dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{GnssReading, SamplePayload};
    use rand::Rng;

    fn gnss_sample(frame: u64) -> Sample {
        Sample::new(
            frame as f64 * 0.05,
            frame,
            SamplePayload::Gnss(GnssReading {
                latitude: 0.0,
                longitude: 0.0,
                altitude: 0.0,
                local: None,
            }),
        )
    }

    #[tokio::test]
    async fn pop_returns_pushed_sample() {
        let channel = SensorChannel::new(Channel::Gnss, &BackpressureConfig::default());
        channel.push(gnss_sample(11));
        let sample = channel.pop(Duration::from_millis(10)).await.unwrap();
        assert_eq!(sample.frame_number, 11);
        assert!(channel.is_empty());
    }

    #[tokio::test]
    async fn pop_times_out_when_silent() {
        let channel = SensorChannel::new(Channel::Camera, &BackpressureConfig::default());
        let err = channel.pop(Duration::from_millis(20)).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(
            err,
            IngestionError::ChannelTimeout {
                channel: Channel::Camera,
                waited_ms: 20
            }
        ));
    }

    #[test]
    fn drop_oldest_keeps_latest() {
        let channel = SensorChannel::new(
            Channel::Gnss,
            &BackpressureConfig::new(2, DropPolicy::DropOldest),
        );
        for frame in 1..=5 {
            channel.push(gnss_sample(frame));
        }
        assert_eq!(channel.len(), 2);
        assert_eq!(channel.try_pop().map(|s| s.frame_number), Some(4));
        assert_eq!(channel.try_pop().map(|s| s.frame_number), Some(5));
        assert_eq!(channel.metrics().snapshot().samples_dropped, 3);
    }

    #[test]
    fn drop_newest_keeps_earliest() {
        let channel = SensorChannel::new(
            Channel::Gnss,
            &BackpressureConfig::new(2, DropPolicy::DropNewest),
        );
        for frame in 1..=4 {
            channel.push(gnss_sample(frame));
        }
        assert_eq!(channel.try_pop().map(|s| s.frame_number), Some(1));
        assert_eq!(channel.try_pop().map(|s| s.frame_number), Some(2));
        assert_eq!(channel.metrics().snapshot().samples_received, 4);
    }

    #[tokio::test]
    async fn producer_thread_delivers_while_consumer_waits() {
        let channel = Arc::new(SensorChannel::new(
            Channel::Gnss,
            &BackpressureConfig::new(64, DropPolicy::DropOldest),
        ));
        let producer = {
            let channel = channel.clone();
            std::thread::spawn(move || {
                let mut rng = rand::rng();
                for frame in 0..32 {
                    std::thread::sleep(Duration::from_micros(rng.random_range(0..200)));
                    channel.push(gnss_sample(frame));
                }
            })
        };

        let mut frames = Vec::new();
        for _ in 0..32 {
            frames.push(channel.pop(Duration::from_secs(2)).await.unwrap().frame_number);
        }
        producer.join().unwrap();
        assert_eq!(frames, (0..32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn closed_channel_drains_then_reports_closed() {
        let channel = SensorChannel::new(Channel::Gnss, &BackpressureConfig::default());
        channel.push(gnss_sample(1));
        channel.close();
        channel.push(gnss_sample(2));

        assert_eq!(channel.pop(Duration::from_millis(10)).await.unwrap().frame_number, 1);
        assert!(matches!(
            channel.pop(Duration::from_millis(10)).await,
            Err(IngestionError::ChannelClosed { .. })
        ));
    }
}
