//! Sample - Ingestion 输出
//!
//! 单个通道在单个 tick 上的数据，以及模拟器回调交付的原始数据。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Channel, GeoLocation, Location};

/// 单通道单 tick 的样本
///
/// 载荷已从生产者缓冲区深拷贝，可安全跨线程持有。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// 仿真时间戳 (seconds)，单调不减
    pub timestamp: f64,

    /// 帧序号，每个 tick 唯一且单调递增
    pub frame_number: u64,

    /// 数据载荷
    pub payload: SamplePayload,
}

impl Sample {
    /// 创建样本
    pub fn new(timestamp: f64, frame_number: u64, payload: SamplePayload) -> Self {
        Self {
            timestamp,
            frame_number,
            payload,
        }
    }

    /// 样本所属通道（由载荷决定）
    pub fn channel(&self) -> Channel {
        self.payload.channel()
    }
}

/// 样本载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SamplePayload {
    /// RGB 图像
    Camera(ImageData),

    /// 语义分割：调色板彩色图 + 单通道标签图
    Semantic { color: ImageData, labels: ImageData },

    /// 实例分割图 (R = 语义标签, G/B = 实例 ID)
    Instance(ImageData),

    /// GNSS 读数
    Gnss(GnssReading),
}

impl SamplePayload {
    /// 载荷对应的通道
    pub fn channel(&self) -> Channel {
        match self {
            SamplePayload::Camera(_) => Channel::Camera,
            SamplePayload::Semantic { .. } => Channel::Semantic,
            SamplePayload::Instance(_) => Channel::Instance,
            SamplePayload::Gnss(_) => Channel::Gnss,
        }
    }
}

/// 图像数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// 图像宽度
    pub width: u32,

    /// 图像高度
    pub height: u32,

    /// 像素格式
    pub format: ImageFormat,

    /// 像素数据 (行优先，无填充)
    pub data: Bytes,
}

impl ImageData {
    /// 创建图像数据
    pub fn new(width: u32, height: u32, format: ImageFormat, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            format,
            data: data.into(),
        }
    }

    /// 按尺寸与格式应有的字节数
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// 数据长度是否与尺寸匹配
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.expected_len()
    }
}

/// 图像格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Rgb8,
    Gray8,
}

impl ImageFormat {
    /// 每像素字节数
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ImageFormat::Rgb8 => 3,
            ImageFormat::Gray8 => 1,
        }
    }
}

/// GNSS 读数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GnssReading {
    /// 纬度 (度)
    pub latitude: f64,

    /// 经度 (度)
    pub longitude: f64,

    /// 高度 (米)
    pub altitude: f64,

    /// 经地理标定换算得到的本地坐标
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<Location>,
}

impl GnssReading {
    /// 读数的大地坐标部分
    pub fn geolocation(&self) -> GeoLocation {
        GeoLocation {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
        }
    }
}

/// 模拟器回调交付的原始数据
///
/// 回调只拿到借用；缓冲区归生产者所有，回调返回后可能被复用。
#[derive(Debug, Clone)]
pub struct RawSensorData {
    /// 帧序号
    pub frame: u64,

    /// 仿真时间戳 (seconds)
    pub timestamp: f64,

    /// 原始载荷
    pub payload: RawPayload,
}

/// 原始载荷
#[derive(Debug, Clone)]
pub enum RawPayload {
    /// BGRA8 光栅
    Image {
        width: u32,
        height: u32,
        bgra: Vec<u8>,
    },

    /// GNSS 测量
    Gnss(GeoLocation),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_length_consistency() {
        let image = ImageData::new(4, 2, ImageFormat::Rgb8, vec![0u8; 24]);
        assert!(image.is_consistent());

        let truncated = ImageData::new(4, 2, ImageFormat::Gray8, vec![0u8; 6]);
        assert_eq!(truncated.expected_len(), 8);
        assert!(!truncated.is_consistent());
    }

    #[test]
    fn payload_determines_channel() {
        let reading = GnssReading {
            latitude: 0.0,
            longitude: 0.0,
            altitude: 2.0,
            local: None,
        };
        let sample = Sample::new(1.5, 7, SamplePayload::Gnss(reading));
        assert_eq!(sample.channel(), Channel::Gnss);
        assert_eq!(sample.frame_number, 7);
    }
}
