//! # Sync Engine
//!
//! 按帧号把各通道的样本对齐为封装好的 `Frame`。
//!
//! 负责：
//! - 每个 tick 从每个通道各取一个样本
//! - 丢弃过期样本，通道超前时提升目标帧号
//! - 超时内凑不齐时返回 `PartialFrame`，由调用方决定是否继续
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::FrameSynchronizer;
//!
//! let mut synchronizer = FrameSynchronizer::new(rig.channels())?;
//!
//! world.tick().await?;
//! match synchronizer.collect(Duration::from_millis(1000)).await {
//!     Ok(frame) => recorder.buffer(frame).await?,
//!     Err(e) if e.is_partial() => tracing::warn!(error = %e, "skipping frame"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

mod error;
mod synchronizer;

// Re-exports
pub use error::{Result, SyncError};
pub use synchronizer::{FrameSynchronizer, SyncStats};

// Re-export contracts types
pub use contracts::{Channel, Frame};
