//! 针孔相机投影
//!
//! 内参矩阵按 (width, height, fov) 一次性构建；投影把世界坐标点经 4×4
//! 世界到相机矩阵变换后重排坐标轴，再乘内参并做透视除法。

use nalgebra::{Matrix3, Matrix4, Point2, Vector3, Vector4};

use crate::error::{GeometryError, Result};

/// 相机内参矩阵
///
/// `[[f, 0, w/2], [0, f, h/2], [0, 0, 1]]`，相机配置存续期间不变。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntrinsicMatrix {
    matrix: Matrix3<f64>,
    width: u32,
    height: u32,
}

impl IntrinsicMatrix {
    /// 3×3 矩阵
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// 焦距 (像素)
    pub fn focal(&self) -> f64 {
        self.matrix[(0, 0)]
    }

    /// 主点
    pub fn principal_point(&self) -> Point2<f64> {
        Point2::new(self.matrix[(0, 2)], self.matrix[(1, 2)])
    }

    /// 图像宽度
    pub fn width(&self) -> u32 {
        self.width
    }

    /// 图像高度
    pub fn height(&self) -> u32 {
        self.height
    }
}

/// 由图像尺寸与水平视场角构建内参
///
/// `focal = width / (2·tan(fov·π/360))`
///
/// # Errors
/// 尺寸为 0 或视场角不在 (0, 180) 内时返回 [`GeometryError::InvalidCamera`]。
pub fn build_intrinsic(width: u32, height: u32, fov_degrees: f64) -> Result<IntrinsicMatrix> {
    if width == 0 || height == 0 {
        return Err(GeometryError::invalid_camera(format!(
            "image size must be positive, got {}x{}",
            width, height
        )));
    }
    if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
        return Err(GeometryError::invalid_camera(format!(
            "fov must be in (0, 180), got {}",
            fov_degrees
        )));
    }

    let w = width as f64;
    let h = height as f64;
    let focal = w / (2.0 * (fov_degrees * std::f64::consts::PI / 360.0).tan());

    let mut matrix = Matrix3::identity();
    matrix[(0, 0)] = focal;
    matrix[(1, 1)] = focal;
    matrix[(0, 2)] = w / 2.0;
    matrix[(1, 2)] = h / 2.0;

    Ok(IntrinsicMatrix {
        matrix,
        width,
        height,
    })
}

/// 投影世界坐标点，返回未裁剪的像素坐标
pub fn project(
    world_point: &Vector3<f64>,
    intrinsic: &IntrinsicMatrix,
    world_to_camera: &Matrix4<f64>,
) -> Point2<f64> {
    project_with_depth(world_point, intrinsic, world_to_camera).0
}

/// 同 [`project`]，额外返回相机前向深度
///
/// 深度 ≤ 0 的点位于成像平面之后，其像素坐标没有意义。
pub fn project_with_depth(
    world_point: &Vector3<f64>,
    intrinsic: &IntrinsicMatrix,
    world_to_camera: &Matrix4<f64>,
) -> (Point2<f64>, f64) {
    let homogeneous = Vector4::new(world_point.x, world_point.y, world_point.z, 1.0);
    let camera = world_to_camera * homogeneous;

    // (forward, right, up) -> (right, -up, forward)
    let image_axes = Vector3::new(camera.y, -camera.z, camera.x);
    let pixel = intrinsic.matrix * image_axes;
    let depth = pixel.z;

    (Point2::new(pixel.x / depth, pixel.y / depth), depth)
}
