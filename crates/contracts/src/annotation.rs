//! 2D 标注
//!
//! 像素坐标下的轴对齐框，以及一帧相机图像上的框集合。

use serde::{Deserialize, Serialize};

/// 轴对齐 2D 框 (像素坐标)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// 类别名 (e.g., "vehicle")
    pub class_name: String,
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// 框宽度
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// 框高度
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// 框中心
    pub fn center(&self) -> (f64, f64) {
        (
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }

    /// 是否严格位于 `(0, width) × (0, height)` 内
    pub fn is_inside(&self, width: u32, height: u32) -> bool {
        0.0 < self.xmin
            && self.xmin < self.xmax
            && self.xmax < width as f64
            && 0.0 < self.ymin
            && self.ymin < self.ymax
            && self.ymax < height as f64
    }
}

/// 一张图像上的标注集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxSet {
    /// 图像宽度
    pub width: u32,
    /// 图像高度
    pub height: u32,
    /// 通道数
    pub depth: u32,
    /// 按候选顺序保留的框
    pub boxes: Vec<BoundingBox>,
}

impl BoundingBoxSet {
    pub fn new(width: u32, height: u32, depth: u32, boxes: Vec<BoundingBox>) -> Self {
        Self {
            width,
            height,
            depth,
            boxes,
        }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}
