//! Frame synchronizer.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use contracts::{Channel, Frame, Sample};
use ingestion::{IngestionError, SensorChannel};
use tokio::time::Instant;
use tracing::{debug, instrument, trace, warn};

use crate::error::{Result, SyncError};

/// Running counters of one synchronizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Frames sealed
    pub frames_sealed: u64,
    /// Collections that ended as a partial frame
    pub partial_frames: u64,
    /// Samples discarded for being older than the target frame
    pub stale_discarded: u64,
}

/// Collects one sample per registered channel into a sealed [`Frame`]
///
/// Samples are correlated by `frame_number`, never by arrival order.
#[derive(Debug)]
pub struct FrameSynchronizer {
    channels: Vec<Arc<SensorChannel>>,
    expected: Option<u64>,
    stats: SyncStats,
}

impl FrameSynchronizer {
    /// Register the channels to synchronize
    ///
    /// # Errors
    /// [`SyncError::DuplicateChannel`] when two channels share a kind,
    /// [`SyncError::NoChannels`] when none are given.
    pub fn new(channels: Vec<Arc<SensorChannel>>) -> Result<Self> {
        if channels.is_empty() {
            return Err(SyncError::NoChannels);
        }

        let mut channels = channels;
        channels.sort_by_key(|c| c.kind());
        if let Some(pair) = channels.windows(2).find(|w| w[0].kind() == w[1].kind()) {
            return Err(SyncError::DuplicateChannel {
                channel: pair[0].kind(),
            });
        }

        Ok(Self {
            channels,
            expected: None,
            stats: SyncStats::default(),
        })
    }

    /// Registered channel kinds in order
    pub fn channels(&self) -> Vec<Channel> {
        self.channels.iter().map(|c| c.kind()).collect()
    }

    /// Frame number the next collection starts from
    pub fn expected_frame(&self) -> Option<u64> {
        self.expected
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Wait up to `timeout` for one sample of every channel and seal them
    ///
    /// Samples older than the target frame are discarded and the wait goes on
    /// inside the same budget. A channel that has moved ahead raises the target
    /// to its frame; samples already held for older frames are discarded.
    ///
    /// # Errors
    /// [`SyncError::PartialFrame`] naming the channels that delivered nothing
    /// usable before the deadline. The samples gathered for that frame are
    /// dropped and later deliveries for it will count as stale.
    #[instrument(
        name = "frame_collect",
        skip(self),
        fields(expected = ?self.expected)
    )]
    pub async fn collect(&mut self, timeout: Duration) -> Result<Frame> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut target = self.expected.unwrap_or(0);
        let mut held: BTreeMap<Channel, Sample> = BTreeMap::new();
        let mut exhausted: Vec<Channel> = Vec::new();

        while held.len() + exhausted.len() < self.channels.len() {
            for channel in &self.channels {
                let kind = channel.kind();
                if held.contains_key(&kind) || exhausted.contains(&kind) {
                    continue;
                }

                loop {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match channel.pop(remaining).await {
                        Ok(sample) if sample.frame_number < target => {
                            self.stats.stale_discarded += 1;
                            discard_stale(kind, sample.frame_number, target);
                        }
                        Ok(sample) => {
                            if sample.frame_number > target {
                                debug!(
                                    channel = %kind,
                                    from = target,
                                    to = sample.frame_number,
                                    "channel ahead, raising target frame"
                                );
                                target = sample.frame_number;
                                let behind: Vec<Channel> = held
                                    .iter()
                                    .filter(|(_, s)| s.frame_number < target)
                                    .map(|(c, _)| *c)
                                    .collect();
                                for c in behind {
                                    if let Some(old) = held.remove(&c) {
                                        self.stats.stale_discarded += 1;
                                        discard_stale(c, old.frame_number, target);
                                    }
                                }
                            }
                            trace!(channel = %kind, frame = sample.frame_number, "sample held");
                            held.insert(kind, sample);
                            break;
                        }
                        Err(IngestionError::ChannelTimeout { .. }) => {
                            exhausted.push(kind);
                            break;
                        }
                        Err(IngestionError::ChannelClosed { .. }) => {
                            warn!(channel = %kind, "channel closed while collecting");
                            exhausted.push(kind);
                            break;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        let waited = started.elapsed();
        self.expected = Some(target + 1);

        if held.len() < self.channels.len() {
            let missing: Vec<Channel> = self
                .channels
                .iter()
                .map(|c| c.kind())
                .filter(|kind| !held.contains_key(kind))
                .collect();
            self.stats.partial_frames += 1;
            observability::record_partial_frame(&missing);

            let err = SyncError::PartialFrame {
                frame_number: target,
                missing,
                waited_ms: waited.as_millis() as u64,
            };
            warn!(frame = target, error = %err, "partial frame skipped");
            return Err(err);
        }

        let frame = Frame::seal(held.into_values())?;
        self.stats.frames_sealed += 1;
        observability::record_frame_sealed(frame.frame_number(), waited.as_secs_f64() * 1000.0);
        debug!(
            frame = frame.frame_number(),
            timestamp = frame.timestamp(),
            "frame sealed"
        );
        Ok(frame)
    }
}

fn discard_stale(channel: Channel, frame_number: u64, target: u64) {
    observability::record_stale_discard(channel);
    debug!(channel = %channel, frame = frame_number, target, "stale sample discarded");
}
