//! RGB camera decoder

use contracts::{Channel, ImageData, ImageFormat, RawSensorData, Sample, SamplePayload};

use super::common::{bgra_to_rgb, bgra_view};
use crate::error::Result;

/// Decode a BGRA delivery into an RGB sample
pub fn decode(raw: &RawSensorData) -> Result<Sample> {
    let view = bgra_view(raw, Channel::Camera)?;
    let image = ImageData::new(view.width, view.height, ImageFormat::Rgb8, bgra_to_rgb(view.pixels));
    Ok(Sample::new(raw.timestamp, raw.frame, SamplePayload::Camera(image)))
}
