//! Channel - 数据通道枚举
//!
//! 固定的四类传感器数据，每类决定自己的序列化规则。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 传感器数据通道
///
/// 派生的 `Ord` 即录制与落盘顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// RGB 相机
    Camera,
    /// 语义分割相机
    Semantic,
    /// 实例分割相机
    Instance,
    /// GNSS 接收机
    Gnss,
}

impl Channel {
    /// 全部通道（按录制顺序）
    pub const ALL: [Channel; 4] = [
        Channel::Camera,
        Channel::Semantic,
        Channel::Instance,
        Channel::Gnss,
    ];

    /// 小写名称，用于日志与指标标签
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Camera => "camera",
            Channel::Semantic => "semantic",
            Channel::Instance => "instance",
            Channel::Gnss => "gnss",
        }
    }

    /// 该通道落盘时生成的文件后缀（含扩展名）
    pub fn artifact_suffixes(&self) -> &'static [&'static str] {
        match self {
            Channel::Camera => &["img.png"],
            Channel::Semantic => &["color.png", "labelIds.png"],
            Channel::Instance => &["instance.png"],
            Channel::Gnss => &["gnss.json"],
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 附加在相机样本上的标注文件后缀
pub const BOUNDING_BOX_SUFFIX: &str = "bounding_box.xml";
