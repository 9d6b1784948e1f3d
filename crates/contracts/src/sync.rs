//! Frame - Sync Engine output
//!
//! Sealed per-tick aggregate of one sample per channel.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{BoundingBoxSet, Channel, ContractError, Sample};

/// Sealed frame
///
/// Every sample shares one `frame_number`. The frame cannot be mutated after
/// sealing; attaching annotations consumes it and returns a new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    frame_number: u64,
    timestamp: f64,
    samples: BTreeMap<Channel, Sample>,
    bounding_boxes: Option<BoundingBoxSet>,
}

impl Frame {
    /// Seal a set of samples into a frame
    ///
    /// # Errors
    /// Fails on an empty set, mixed frame numbers or a repeated channel.
    pub fn seal(samples: impl IntoIterator<Item = Sample>) -> Result<Self, ContractError> {
        let mut by_channel = BTreeMap::new();
        let mut frame_number = None;
        let mut timestamp = f64::NEG_INFINITY;

        for sample in samples {
            match frame_number {
                None => frame_number = Some(sample.frame_number),
                Some(expected) if expected != sample.frame_number => {
                    return Err(ContractError::frame_seal(format!(
                        "channel {} carries frame {} but frame {} is being sealed",
                        sample.channel(),
                        sample.frame_number,
                        expected
                    )));
                }
                Some(_) => {}
            }
            timestamp = timestamp.max(sample.timestamp);

            let channel = sample.channel();
            if by_channel.insert(channel, sample).is_some() {
                return Err(ContractError::frame_seal(format!(
                    "channel {} appears twice",
                    channel
                )));
            }
        }

        let frame_number =
            frame_number.ok_or_else(|| ContractError::frame_seal("no samples to seal"))?;

        Ok(Self {
            frame_number,
            timestamp,
            samples: by_channel,
            bounding_boxes: None,
        })
    }

    /// Frame sequence number shared by all samples
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Latest simulation timestamp among the samples (seconds)
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Sample of one channel
    pub fn sample(&self, channel: Channel) -> Option<&Sample> {
        self.samples.get(&channel)
    }

    /// Samples in channel order
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.values()
    }

    /// Channels present in this frame
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.samples.keys().copied()
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a sealed frame
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Attached annotations, if any
    pub fn bounding_boxes(&self) -> Option<&BoundingBoxSet> {
        self.bounding_boxes.as_ref()
    }

    /// Attach annotations, replacing any previous set
    pub fn with_bounding_boxes(mut self, boxes: BoundingBoxSet) -> Self {
        self.bounding_boxes = Some(boxes);
        self
    }

    /// Split into samples (channel order) and annotations
    pub fn into_parts(self) -> (Vec<Sample>, Option<BoundingBoxSet>) {
        (self.samples.into_values().collect(), self.bounding_boxes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GnssReading, ImageData, ImageFormat, SamplePayload};

    fn camera(frame: u64) -> Sample {
        Sample::new(
            frame as f64 * 0.05,
            frame,
            SamplePayload::Camera(ImageData::new(1, 1, ImageFormat::Rgb8, vec![1u8, 2, 3])),
        )
    }

    fn gnss(frame: u64) -> Sample {
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

    #[test]
    fn seal_orders_by_channel() {
        let frame = Frame::seal(vec![gnss(3), camera(3)]).unwrap();
        assert_eq!(frame.frame_number(), 3);
        let channels: Vec<_> = frame.channels().collect();
        assert_eq!(channels, vec![Channel::Camera, Channel::Gnss]);
        assert!(frame.bounding_boxes().is_none());
    }

    #[test]
    fn seal_rejects_mixed_frames() {
        let err = Frame::seal(vec![camera(3), gnss(4)]).unwrap_err();
        assert!(matches!(err, ContractError::FrameSeal { .. }));
    }

    #[test]
    fn seal_rejects_duplicate_channel() {
        assert!(Frame::seal(vec![camera(3), camera(3)]).is_err());
        assert!(Frame::seal(Vec::new()).is_err());
    }

    #[test]
    fn attaching_boxes_returns_new_frame() {
        let frame = Frame::seal(vec![camera(9)]).unwrap();
        let boxes = BoundingBoxSet::new(800, 600, 3, Vec::new());
        let annotated = frame.with_bounding_boxes(boxes.clone());
        assert_eq!(annotated.bounding_boxes(), Some(&boxes));
        let (samples, attached) = annotated.into_parts();
        assert_eq!(samples.len(), 1);
        assert!(attached.is_some());
    }
}
