//! Sync Engine 错误类型

use contracts::{Channel, ContractError};
use ingestion::IngestionError;
use thiserror::Error;

/// Sync Engine 错误
#[derive(Debug, Error)]
pub enum SyncError {
    /// 超时内未能凑齐所有通道
    #[error("frame {frame_number} incomplete after {waited_ms}ms, missing {}", join(.missing))]
    PartialFrame {
        /// 目标帧号
        frame_number: u64,
        /// 缺失的通道
        missing: Vec<Channel>,
        /// 实际等待时长
        waited_ms: u64,
    },

    /// 同一通道注册了两次
    #[error("channel {channel} registered twice")]
    DuplicateChannel { channel: Channel },

    /// 没有注册任何通道
    #[error("no channels registered")]
    NoChannels,

    /// 封装帧失败
    #[error(transparent)]
    Seal(#[from] ContractError),

    /// 通道错误
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
}

impl SyncError {
    /// 是否为不完整帧 (可记录后继续)
    pub fn is_partial(&self) -> bool {
        matches!(self, SyncError::PartialFrame { .. })
    }

    /// 不完整帧的缺失通道
    pub fn missing(&self) -> &[Channel] {
        match self {
            SyncError::PartialFrame { missing, .. } => missing,
            _ => &[],
        }
    }
}

fn join(channels: &[Channel]) -> String {
    channels
        .iter()
        .map(Channel::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, SyncError>;
