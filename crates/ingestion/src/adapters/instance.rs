//! Instance segmentation decoder
//!
//! R carries the semantic tag, G and B the low and high byte of the instance id.

use contracts::{Channel, ImageData, ImageFormat, RawSensorData, Sample, SamplePayload};

use super::common::{bgra_to_rgb, bgra_view};
use crate::error::Result;

pub fn decode(raw: &RawSensorData) -> Result<Sample> {
    let view = bgra_view(raw, Channel::Instance)?;
    let image = ImageData::new(view.width, view.height, ImageFormat::Rgb8, bgra_to_rgb(view.pixels));
    Ok(Sample::new(raw.timestamp, raw.frame, SamplePayload::Instance(image)))
}

/// Instance id encoded in an RGB pixel
#[inline]
pub fn instance_id(rgb: [u8; 3]) -> u16 {
    u16::from_le_bytes([rgb[1], rgb[2]])
}
