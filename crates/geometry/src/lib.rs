//! # Geometry
//!
//! 投影几何与地理标定。
//!
//! - 针孔内参与世界点投影
//! - 模拟器约定下的刚体变换
//! - 大地坐标 ↔ 本地坐标的仿射标定
//! - 由 actor 状态计算完全可见的 2D 框

pub mod bounding;
pub mod error;
pub mod geodetic;
pub mod projection;
pub mod transform;

pub use bounding::{extract, BoundingBoxExtractor, EgoPose};
pub use error::{GeometryError, Result};
pub use geodetic::{ControlPointSet, GeodeticTransform};
pub use projection::{build_intrinsic, project, project_with_depth, IntrinsicMatrix};
pub use transform::{
    compose, forward_vector, inverse_matrix, rotation_matrix, transform_matrix, transform_point,
    world_vertices,
};
