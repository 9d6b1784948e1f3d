//! Adapter common utility functions

use bytes::Bytes;
use contracts::{Channel, RawPayload, RawSensorData};

use crate::error::{IngestionError, Result};

/// Borrowed BGRA raster from a raw delivery
pub struct BgraView<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

/// Validate an image delivery and borrow its pixels
pub fn bgra_view(raw: &RawSensorData, channel: Channel) -> Result<BgraView<'_>> {
    match &raw.payload {
        RawPayload::Image {
            width,
            height,
            bgra,
        } => {
            let expected = *width as usize * *height as usize * 4;
            if bgra.len() != expected {
                return Err(IngestionError::parse_failed(
                    channel,
                    format!(
                        "{}x{} BGRA image needs {} bytes, got {}",
                        width,
                        height,
                        expected,
                        bgra.len()
                    ),
                ));
            }
            Ok(BgraView {
                width: *width,
                height: *height,
                pixels: bgra,
            })
        }
        RawPayload::Gnss(_) => Err(IngestionError::parse_failed(
            channel,
            "expected an image, got a gnss measurement",
        )),
    }
}

/// Copy BGRA pixels into an owned RGB buffer
#[inline]
pub fn bgra_to_rgb(pixels: &[u8]) -> Bytes {
    let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
    for px in pixels.chunks_exact(4) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    Bytes::from(rgb)
}

/// Copy one BGRA channel (0 = B, 1 = G, 2 = R) into an owned buffer
#[inline]
pub fn bgra_channel(pixels: &[u8], index: usize) -> Bytes {
    pixels.chunks_exact(4).map(|px| px[index]).collect::<Vec<u8>>().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32, bgra: Vec<u8>) -> RawSensorData {
        RawSensorData {
            frame: 1,
            timestamp: 0.05,
            payload: RawPayload::Image {
                width,
                height,
                bgra,
            },
        }
    }

    #[test]
    fn rgb_reorders_and_drops_alpha() {
        let rgb = bgra_to_rgb(&[10, 20, 30, 255, 1, 2, 3, 0]);
        assert_eq!(&rgb[..], &[30, 20, 10, 3, 2, 1]);
    }

    #[test]
    fn channel_extraction() {
        let red = bgra_channel(&[10, 20, 30, 255, 1, 2, 3, 0], 2);
        assert_eq!(&red[..], &[30, 3]);
    }

    #[test]
    fn length_mismatch_is_parse_error() {
        let raw = image(2, 2, vec![0; 15]);
        let err = bgra_view(&raw, Channel::Camera).err().unwrap();
        assert!(matches!(err, IngestionError::ParseFailed { channel: Channel::Camera, .. }));

        let raw = image(2, 2, vec![0; 16]);
        assert_eq!(bgra_view(&raw, Channel::Camera).unwrap().pixels.len(), 16);
    }
}
