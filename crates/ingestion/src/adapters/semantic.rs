//! 语义分割解码
//!
//! 标签位于 BGRA 的 R 通道；彩色图按 CityScapes 调色板着色。

use bytes::Bytes;
use contracts::{Channel, ImageData, ImageFormat, RawSensorData, Sample, SamplePayload};

use super::common::{bgra_channel, bgra_view};
use crate::error::Result;

/// CityScapes 调色板，按模拟器语义标签索引
pub const CITYSCAPES_PALETTE: [[u8; 3]; 29] = [
    [0, 0, 0],       // 0 unlabeled
    [128, 64, 128],  // 1 road
    [244, 35, 232],  // 2 sidewalk
    [70, 70, 70],    // 3 building
    [102, 102, 156], // 4 wall
    [190, 153, 153], // 5 fence
    [153, 153, 153], // 6 pole
    [250, 170, 30],  // 7 traffic light
    [220, 220, 0],   // 8 traffic sign
    [107, 142, 35],  // 9 vegetation
    [152, 251, 152], // 10 terrain
    [70, 130, 180],  // 11 sky
    [220, 20, 60],   // 12 pedestrian
    [255, 0, 0],     // 13 rider
    [0, 0, 142],     // 14 car
    [0, 0, 70],      // 15 truck
    [0, 60, 100],    // 16 bus
    [0, 80, 100],    // 17 train
    [0, 0, 230],     // 18 motorcycle
    [119, 11, 32],   // 19 bicycle
    [110, 190, 160], // 20 static
    [170, 120, 50],  // 21 dynamic
    [55, 90, 80],    // 22 other
    [45, 60, 150],   // 23 water
    [157, 234, 50],  // 24 road line
    [81, 0, 81],     // 25 ground
    [150, 100, 100], // 26 bridge
    [230, 150, 140], // 27 rail track
    [180, 165, 180], // 28 guard rail
];

/// 标签对应的颜色（未知标签为黑色）
#[inline]
pub fn palette_color(label: u8) -> [u8; 3] {
    CITYSCAPES_PALETTE
        .get(label as usize)
        .copied()
        .unwrap_or([0, 0, 0])
}

/// 解码为彩色图 + 标签图
pub fn decode(raw: &RawSensorData) -> Result<Sample> {
    let view = bgra_view(raw, Channel::Semantic)?;
    let labels = bgra_channel(view.pixels, 2);

    let mut color = Vec::with_capacity(labels.len() * 3);
    for &label in labels.iter() {
        color.extend_from_slice(&palette_color(label));
    }

    let payload = SamplePayload::Semantic {
        color: ImageData::new(view.width, view.height, ImageFormat::Rgb8, Bytes::from(color)),
        labels: ImageData::new(view.width, view.height, ImageFormat::Gray8, labels),
    };
    Ok(Sample::new(raw.timestamp, raw.frame, payload))
}
