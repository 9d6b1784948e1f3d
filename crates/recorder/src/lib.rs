//! # Recorder
//!
//! 数据录制模块。
//!
//! 负责：
//! - 按通道缓冲封装好的 `Frame`，容量有上限
//! - 缓冲满时批量写出 PNG / JSON / VOC 文件
//! - 读取已写出的标注文件 (`parse_voc`)

pub mod codec;
pub mod error;
pub mod naming;
pub mod recorder;
pub mod storage;
pub mod voc;

pub use codec::{encode_png, encode_sample, GnssRecord};
pub use contracts::{Frame, Storage};
pub use error::{RecorderError, Result};
pub use naming::{artifact_name, parse_artifact_name, suffix_channel, ArtifactName};
pub use recorder::{BoundedRecorder, FlushReport};
pub use storage::{DirectoryStorage, MemoryStorage};
pub use voc::{parse_voc, write_voc};
