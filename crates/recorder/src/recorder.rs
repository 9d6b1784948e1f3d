//! BoundedRecorder - buffers frames per channel and flushes them in batches

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use contracts::{BoundingBoxSet, Channel, Frame, RecorderConfig, Sample, Storage};
use tracing::{debug, error, info, instrument};

use crate::codec::encode_sample;
use crate::error::{RecorderError, Result};
use crate::storage::DirectoryStorage;

/// Outcome of one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Frames written
    pub frames: usize,
    /// Files written
    pub artifacts: usize,
    /// Wall time spent
    pub duration: Duration,
}

/// Per-channel frame buffer with a fixed capacity
///
/// Every channel list has the same length; `buffer` flushes first when the
/// buffer is full. At most `capacity` frames are held while flushes succeed.
pub struct BoundedRecorder<S> {
    map_name: String,
    capacity: usize,
    storage: S,
    buffers: BTreeMap<Channel, Vec<Sample>>,
    annotations: Vec<Option<BoundingBoxSet>>,
}

impl BoundedRecorder<DirectoryStorage> {
    /// Recorder writing to `save_path/<map>`
    ///
    /// # Errors
    /// Fails when the output directory cannot be created or capacity is zero.
    pub fn create(config: &RecorderConfig, map_name: &str) -> Result<Self> {
        let storage = DirectoryStorage::create(config.save_path.join(map_name))?;
        Self::new(config.capacity, map_name, storage)
    }
}

impl<S: Storage> BoundedRecorder<S> {
    pub fn new(capacity: usize, map_name: impl Into<String>, storage: S) -> Result<Self> {
        if capacity == 0 {
            return Err(RecorderError::ZeroCapacity);
        }
        Ok(Self {
            map_name: map_name.into(),
            capacity,
            storage,
            buffers: Channel::ALL.iter().map(|c| (*c, Vec::new())).collect(),
            annotations: Vec::new(),
        })
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Frames currently buffered
    ///
    /// # Panics
    /// If the channel lists ever disagree in length.
    pub fn size(&self) -> usize {
        let mut lengths = self.buffers.values().map(Vec::len);
        let size = lengths.next().unwrap_or(0);
        assert!(
            lengths.all(|len| len == size) && self.annotations.len() == size,
            "recorder channel buffers out of step"
        );
        size
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Append one frame, flushing first when the buffer is full
    ///
    /// Returns the report of that flush, if one happened. The frame is
    /// appended even when that flush fails, so the buffer may exceed
    /// `capacity` until a later flush succeeds.
    ///
    /// # Errors
    /// [`RecorderError::MissingChannel`] if the frame lacks a channel (nothing
    /// is buffered); otherwise the error of the flush before the append.
    #[instrument(
        name = "recorder_buffer",
        level = "debug",
        skip(self, frame),
        fields(frame = frame.frame_number())
    )]
    pub async fn buffer(&mut self, frame: Frame) -> Result<Option<FlushReport>> {
        for channel in self.buffers.keys() {
            if frame.sample(*channel).is_none() {
                return Err(RecorderError::MissingChannel {
                    frame_number: frame.frame_number(),
                    channel: *channel,
                });
            }
        }

        let flushed = if self.size() >= self.capacity {
            Some(self.flush().await)
        } else {
            None
        };

        let (samples, boxes) = frame.into_parts();
        for sample in samples {
            if let Some(list) = self.buffers.get_mut(&sample.channel()) {
                list.push(sample);
            }
        }
        self.annotations.push(boxes);

        let size = self.size();
        observability::record_frame_buffered(size);
        debug!(size, capacity = self.capacity, "frame buffered");
        flushed.transpose()
    }

    /// Write every buffered sample, then clear
    ///
    /// No-op on an empty buffer. On failure the buffer is left intact; files
    /// already written stay in storage.
    #[instrument(
        name = "recorder_flush",
        skip(self),
        fields(map = %self.map_name, location = %self.storage.location())
    )]
    pub async fn flush(&mut self) -> Result<FlushReport> {
        let frames = self.size();
        if frames == 0 {
            return Ok(FlushReport::default());
        }

        let started = Instant::now();
        let mut artifacts = 0;
        if let Err(e) = self.write_all(&mut artifacts).await {
            let elapsed = started.elapsed();
            observability::record_flush(frames, artifacts, elapsed.as_secs_f64() * 1000.0, false);
            error!(frames, written = artifacts, error = %e, "flush failed, buffer kept");
            return Err(e);
        }

        for list in self.buffers.values_mut() {
            list.clear();
        }
        self.annotations.clear();

        let duration = started.elapsed();
        observability::record_flush(frames, artifacts, duration.as_secs_f64() * 1000.0, true);
        info!(
            frames,
            artifacts,
            duration_ms = duration.as_millis() as u64,
            "buffer flushed"
        );
        Ok(FlushReport {
            frames,
            artifacts,
            duration,
        })
    }

    async fn write_all(&mut self, written: &mut usize) -> Result<()> {
        for (channel, samples) in &self.buffers {
            for (index, sample) in samples.iter().enumerate() {
                let boxes = match channel {
                    Channel::Camera => self.annotations[index].as_ref(),
                    _ => None,
                };
                for (name, bytes) in encode_sample(&self.map_name, sample, boxes)? {
                    self.storage.put(&name, &bytes).await?;
                    *written += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::voc::parse_voc;
    use contracts::{
        BoundingBox, GnssReading, ImageData, ImageFormat, RecorderConfig, SamplePayload,
    };
    use tempfile::tempdir;

    fn rgb(width: u32, height: u32) -> ImageData {
        ImageData::new(
            width,
            height,
            ImageFormat::Rgb8,
            vec![128u8; (width * height * 3) as usize],
        )
    }

    fn frame(number: u64) -> Frame {
        let ts = number as f64 * 0.05;
        Frame::seal([
            Sample::new(ts, number, SamplePayload::Camera(rgb(4, 2))),
            Sample::new(
                ts,
                number,
                SamplePayload::Semantic {
                    color: rgb(4, 2),
                    labels: ImageData::new(4, 2, ImageFormat::Gray8, vec![7u8; 8]),
                },
            ),
            Sample::new(ts, number, SamplePayload::Instance(rgb(4, 2))),
            Sample::new(
                ts,
                number,
                SamplePayload::Gnss(GnssReading {
                    latitude: 0.0,
                    longitude: 0.0,
                    altitude: 2.0,
                    local: None,
                }),
            ),
        ])
        .unwrap()
    }

    fn annotated(number: u64) -> Frame {
        frame(number).with_bounding_boxes(BoundingBoxSet::new(
            4,
            2,
            3,
            vec![BoundingBox {
                class_name: "vehicle".into(),
                xmin: 0.5,
                ymin: 0.5,
                xmax: 3.0,
                ymax: 1.5,
            }],
        ))
    }

    fn recorder(capacity: usize) -> BoundedRecorder<MemoryStorage> {
        BoundedRecorder::new(capacity, "Town01", MemoryStorage::new()).unwrap()
    }

    #[tokio::test]
    async fn size_tracks_buffer_calls() {
        let mut recorder = recorder(8);
        assert_eq!(recorder.size(), 0);
        for n in 1..=5 {
            recorder.buffer(frame(n * 100)).await.unwrap();
            assert_eq!(recorder.size(), n as usize);
        }
        assert!(recorder.storage().is_empty());
    }

    #[tokio::test]
    async fn flush_writes_every_artifact_and_clears() {
        let mut recorder = recorder(8);
        recorder.buffer(annotated(100)).await.unwrap();
        recorder.buffer(frame(200)).await.unwrap();

        let report = recorder.flush().await.unwrap();
        assert_eq!(report.frames, 2);
        // 5 per frame plus one annotation
        assert_eq!(report.artifacts, 11);
        assert_eq!(recorder.size(), 0);

        let storage = recorder.storage();
        for name in [
            "Town01_000005_000100_img.png",
            "Town01_000005_000100_bounding_box.xml",
            "Town01_000005_000100_color.png",
            "Town01_000005_000100_labelIds.png",
            "Town01_000005_000100_instance.png",
            "Town01_000005_000100_gnss.json",
            "Town01_000010_000200_img.png",
        ] {
            assert!(storage.get(name).is_some(), "missing {}", name);
        }
        assert!(storage.get("Town01_000010_000200_bounding_box.xml").is_none());

        let xml = std::str::from_utf8(storage.get("Town01_000005_000100_bounding_box.xml").unwrap())
            .unwrap();
        assert_eq!(parse_voc(xml).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_flush_touches_nothing() {
        let mut recorder = recorder(2);
        let report = recorder.flush().await.unwrap();
        assert_eq!(report, FlushReport::default());
        assert_eq!(recorder.storage().writes(), 0);
    }

    #[tokio::test]
    async fn full_buffer_flushes_before_append() {
        let mut recorder = recorder(2);
        assert!(recorder.buffer(frame(1)).await.unwrap().is_none());
        assert!(recorder.buffer(frame(2)).await.unwrap().is_none());

        let report = recorder.buffer(frame(3)).await.unwrap().unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(recorder.size(), 1);
        assert_eq!(recorder.storage().len(), 10);
    }

    #[tokio::test]
    async fn failed_flush_keeps_buffer() {
        let mut recorder =
            BoundedRecorder::new(4, "Town01", MemoryStorage::refusing("gnss.json")).unwrap();
        recorder.buffer(frame(1)).await.unwrap();
        recorder.buffer(frame(2)).await.unwrap();

        let err = recorder.flush().await.unwrap_err();
        assert!(matches!(err, RecorderError::Contract(_)));
        assert_eq!(recorder.size(), 2);

        // retry rewrites the same names
        recorder.storage_mut().stop_refusing();
        let report = recorder.flush().await.unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(recorder.storage().len(), 10);
        assert_eq!(recorder.size(), 0);
    }

    #[tokio::test]
    async fn frame_survives_failed_flush_at_capacity() {
        let mut recorder =
            BoundedRecorder::new(1, "Town01", MemoryStorage::refusing("gnss.json")).unwrap();
        recorder.buffer(frame(100)).await.unwrap();

        let err = recorder.buffer(frame(200)).await.unwrap_err();
        assert!(matches!(err, RecorderError::Contract(_)));
        assert_eq!(recorder.size(), 2);

        recorder.storage_mut().stop_refusing();
        let report = recorder.flush().await.unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(recorder.size(), 0);
        for name in [
            "Town01_000005_000100_gnss.json",
            "Town01_000010_000200_img.png",
            "Town01_000010_000200_gnss.json",
        ] {
            assert!(recorder.storage().get(name).is_some(), "missing {}", name);
        }
        assert_eq!(recorder.storage().len(), 10);
    }

    #[tokio::test]
    async fn incomplete_frame_is_rejected_without_side_effects() {
        let mut recorder = recorder(2);
        let partial = Frame::seal([Sample::new(0.0, 1, SamplePayload::Camera(rgb(1, 1)))]).unwrap();

        let err = recorder.buffer(partial).await.unwrap_err();
        assert!(matches!(
            err,
            RecorderError::MissingChannel {
                frame_number: 1,
                channel: Channel::Semantic
            }
        ));
        assert_eq!(recorder.size(), 0);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            BoundedRecorder::new(0, "Town01", MemoryStorage::new()),
            Err(RecorderError::ZeroCapacity)
        ));
    }

    #[tokio::test]
    async fn create_builds_map_directory() {
        let dir = tempdir().unwrap();
        let config = RecorderConfig {
            save_path: dir.path().join("outputs"),
            capacity: 1,
        };
        let mut recorder = BoundedRecorder::create(&config, "Town10HD").unwrap();
        assert!(dir.path().join("outputs/Town10HD").is_dir());

        recorder.buffer(frame(20)).await.unwrap();
        recorder.flush().await.unwrap();
        assert!(dir
            .path()
            .join("outputs/Town10HD/Town10HD_000001_000020_img.png")
            .is_file());
    }
}
