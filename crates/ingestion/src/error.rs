//! Ingestion 错误类型

use contracts::{Channel, ContractError};
use geometry::GeometryError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 传感器数据解析失败
    #[error("failed to parse {channel} data: {message}")]
    ParseFailed {
        /// 通道
        channel: Channel,
        /// 错误消息
        message: String,
    },

    /// 在超时时间内没有样本到达
    #[error("no {channel} sample within {waited_ms}ms")]
    ChannelTimeout {
        /// 通道
        channel: Channel,
        /// 已等待时长
        waited_ms: u64,
    },

    /// 通道已关闭
    #[error("channel closed for {channel}")]
    ChannelClosed {
        /// 通道
        channel: Channel,
    },

    /// 同一通道重复注册
    #[error("channel {channel} is already attached to the rig")]
    DuplicateChannel {
        /// 通道
        channel: Channel,
    },

    /// 传感器已销毁
    #[error("sensor {actor_id} ({channel}) has been destroyed")]
    SensorDestroyed {
        /// 通道
        channel: Channel,
        /// 传感器 actor
        actor_id: u32,
    },

    /// 相机内参或地理标定失败
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// World 调用失败
    #[error(transparent)]
    World(#[from] ContractError),
}

impl IngestionError {
    /// 创建解析错误
    pub fn parse_failed(channel: Channel, message: impl Into<String>) -> Self {
        Self::ParseFailed {
            channel,
            message: message.into(),
        }
    }

    /// 是否为超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ChannelTimeout { .. })
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
