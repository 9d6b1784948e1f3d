//! Geometry 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Geometry 错误
#[derive(Debug, Error)]
pub enum GeometryError {
    /// 相机参数非法
    #[error("invalid camera parameters: {message}")]
    InvalidCamera {
        /// 错误消息
        message: String,
    },

    /// 标定控制点退化 (矩阵奇异)
    #[error("degenerate control points: {message}")]
    DegenerateControlPoints {
        /// 错误消息
        message: String,
    },
}

impl GeometryError {
    /// 创建相机参数错误
    pub fn invalid_camera(message: impl Into<String>) -> Self {
        Self::InvalidCamera {
            message: message.into(),
        }
    }

    /// 创建控制点退化错误
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateControlPoints {
            message: message.into(),
        }
    }
}

impl From<GeometryError> for ContractError {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::InvalidCamera { message } => {
                ContractError::config_validation("sensors.camera", message)
            }
            GeometryError::DegenerateControlPoints { message } => {
                ContractError::config_validation("world.georeference", message)
            }
        }
    }
}

/// Geometry Result 类型别名
pub type Result<T> = std::result::Result<T, GeometryError>;
