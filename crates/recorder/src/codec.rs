//! Sample encoders: PNG images and GNSS JSON.

use contracts::{BoundingBoxSet, GnssReading, ImageData, ImageFormat, Sample, SamplePayload};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};

use crate::error::{RecorderError, Result};
use crate::naming::artifact_name;
use crate::voc::write_voc;

/// Encode an image buffer as PNG
pub fn encode_png(artifact: &str, image: &ImageData) -> Result<Vec<u8>> {
    if !image.is_consistent() {
        return Err(RecorderError::encode(
            artifact,
            format!(
                "buffer holds {} bytes, {}x{} {:?} needs {}",
                image.data.len(),
                image.width,
                image.height,
                image.format,
                image.expected_len()
            ),
        ));
    }

    let mut out = Vec::new();
    let encoder = PngEncoder::new(&mut out);
    let result = match image.format {
        ImageFormat::Rgb8 => encoder.write_image(
            &image.data,
            image.width,
            image.height,
            ExtendedColorType::Rgb8,
        ),
        ImageFormat::Gray8 => encoder.write_image(
            &image.data,
            image.width,
            image.height,
            ExtendedColorType::L8,
        ),
    };
    result.map_err(|e| RecorderError::encode(artifact, e.to_string()))?;
    Ok(out)
}

/// On-disk GNSS record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GnssRecord {
    pub timestamp: f64,
    pub frame: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl GnssRecord {
    pub fn new(timestamp: f64, frame: u64, reading: &GnssReading) -> Self {
        Self {
            timestamp,
            frame,
            latitude: reading.latitude,
            longitude: reading.longitude,
            altitude: reading.altitude,
            x: reading.local.map(|l| l.x),
            y: reading.local.map(|l| l.y),
            z: reading.local.map(|l| l.z),
        }
    }
}

/// Encode every artifact of one sample as `(file name, bytes)`
///
/// `boxes` is only written next to a camera sample.
pub fn encode_sample(
    map: &str,
    sample: &Sample,
    boxes: Option<&BoundingBoxSet>,
) -> Result<Vec<(String, Vec<u8>)>> {
    let name = |suffix: &str| artifact_name(map, sample.timestamp, sample.frame_number, suffix);

    let artifacts = match &sample.payload {
        SamplePayload::Camera(image) => {
            let image_name = name("img.png");
            let mut artifacts = vec![(image_name.clone(), encode_png(&image_name, image)?)];
            if let Some(boxes) = boxes {
                let xml_name = name(contracts::BOUNDING_BOX_SUFFIX);
                artifacts.push((xml_name, write_voc(boxes, &image_name)?));
            }
            artifacts
        }
        SamplePayload::Semantic { color, labels } => {
            let color_name = name("color.png");
            let labels_name = name("labelIds.png");
            let color_png = encode_png(&color_name, color)?;
            let labels_png = encode_png(&labels_name, labels)?;
            vec![(color_name, color_png), (labels_name, labels_png)]
        }
        SamplePayload::Instance(image) => {
            let instance_name = name("instance.png");
            let png = encode_png(&instance_name, image)?;
            vec![(instance_name, png)]
        }
        SamplePayload::Gnss(reading) => {
            let gnss_name = name("gnss.json");
            let record = GnssRecord::new(sample.timestamp, sample.frame_number, reading);
            let json = serde_json::to_vec(&record)
                .map_err(|e| RecorderError::encode(&gnss_name, e.to_string()))?;
            vec![(gnss_name, json)]
        }
    };
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BoundingBox, Location};

    #[test]
    fn png_round_trips_through_image_crate() {
        let data: Vec<u8> = (0..2 * 3 * 3).map(|v| v as u8).collect();
        let png = encode_png("img.png", &ImageData::new(2, 3, ImageFormat::Rgb8, data.clone()))
            .unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (2, 3));
        assert_eq!(decoded.into_raw(), data);
    }

    #[test]
    fn gray_png_keeps_single_channel() {
        let png = encode_png("labels", &ImageData::new(2, 2, ImageFormat::Gray8, vec![1, 7, 14, 0]))
            .unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!(decoded.to_luma8().into_raw(), vec![1, 7, 14, 0]);
    }

    #[test]
    fn inconsistent_buffer_is_rejected() {
        let err = encode_png("bad.png", &ImageData::new(4, 4, ImageFormat::Rgb8, vec![0u8; 5]))
            .unwrap_err();
        assert!(matches!(err, RecorderError::Encode { .. }));
    }

    #[test]
    fn gnss_json_fields() {
        let reading = GnssReading {
            latitude: 1.5,
            longitude: -2.25,
            altitude: 3.0,
            local: Some(Location::new(10.0, 20.0, 0.5)),
        };
        let sample = Sample::new(12.4, 248, SamplePayload::Gnss(reading));
        let artifacts = encode_sample("Town01", &sample, None).unwrap();

        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].0, "Town01_000012_000248_gnss.json");
        let value: serde_json::Value = serde_json::from_slice(&artifacts[0].1).unwrap();
        assert_eq!(value["frame"], 248);
        assert_eq!(value["latitude"], 1.5);
        assert_eq!(value["x"], 10.0);
    }

    #[test]
    fn gnss_without_local_omits_xyz() {
        let reading = GnssReading {
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            local: None,
        };
        let record = GnssRecord::new(0.0, 1, &reading);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("\"x\""));
    }

    #[test]
    fn camera_with_boxes_emits_annotation() {
        let sample = Sample::new(
            3.0,
            60,
            SamplePayload::Camera(ImageData::new(1, 1, ImageFormat::Rgb8, vec![9, 9, 9])),
        );
        let boxes = BoundingBoxSet::new(
            1,
            1,
            3,
            vec![BoundingBox {
                class_name: "vehicle".into(),
                xmin: 0.1,
                ymin: 0.2,
                xmax: 0.8,
                ymax: 0.9,
            }],
        );

        let names: Vec<_> = encode_sample("Town01", &sample, Some(&boxes))
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec!["Town01_000003_000060_img.png", "Town01_000003_000060_bounding_box.xml"]
        );
    }
}
