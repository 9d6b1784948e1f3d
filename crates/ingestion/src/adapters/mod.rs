//! 传感器解码模块
//!
//! 每个解码器把模拟器交付的原始数据深拷贝为对应通道的 `Sample`。

pub mod camera;
pub mod common;
pub mod gnss;
pub mod instance;
pub mod semantic;

pub use semantic::{palette_color, CITYSCAPES_PALETTE};
