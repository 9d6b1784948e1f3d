//! 传感器渲染
//!
//! 相机类传感器输出 BGRA8 光栅：地平线以上为天空、以下为路面，车辆按投影
//! 矩形由远及近覆盖。三种相机只在颜色编码上不同：
//! - RGB: 可视颜色
//! - 语义: R = 语义标签
//! - 实例: R = 语义标签, G/B = 实例 ID 低/高字节
//!
//! GNSS 输出以地理参考点为原点的 Mercator 读数，可叠加偏置与高斯噪声。

use contracts::{
    ActorId, ActorSnapshot, CameraConfig, Channel, GeoLocation, GnssConfig, Location,
    SensorSpec, Transform,
};
use geometry::{build_intrinsic, inverse_matrix, project_with_depth, world_vertices, IntrinsicMatrix};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::error::{Result, SimulationError};
use crate::geodesy;

/// CARLA 语义标签
pub const TAG_ROAD: u8 = 1;
pub const TAG_SKY: u8 = 11;
pub const TAG_CAR: u8 = 14;

const OPAQUE: u8 = 255;

// BGRA
const SKY_COLOR: [u8; 4] = [235, 206, 135, OPAQUE];
const ROAD_COLOR: [u8; 4] = [96, 96, 96, OPAQUE];
const BODY_COLORS: [[u8; 4]; 6] = [
    [40, 40, 200, OPAQUE],
    [200, 200, 200, OPAQUE],
    [30, 30, 30, OPAQUE],
    [160, 90, 20, OPAQUE],
    [40, 160, 40, OPAQUE],
    [20, 200, 230, OPAQUE],
];

/// 相机光栅的颜色编码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterKind {
    Rgb,
    Semantic,
    Instance,
}

impl RasterKind {
    /// 相机类通道对应的编码；GNSS 返回 None
    pub fn for_channel(channel: Channel) -> Option<Self> {
        match channel {
            Channel::Camera => Some(RasterKind::Rgb),
            Channel::Semantic => Some(RasterKind::Semantic),
            Channel::Instance => Some(RasterKind::Instance),
            Channel::Gnss => None,
        }
    }

    fn sky(&self) -> [u8; 4] {
        match self {
            RasterKind::Rgb => SKY_COLOR,
            RasterKind::Semantic | RasterKind::Instance => [0, 0, TAG_SKY, OPAQUE],
        }
    }

    fn road(&self) -> [u8; 4] {
        match self {
            RasterKind::Rgb => ROAD_COLOR,
            RasterKind::Semantic | RasterKind::Instance => [0, 0, TAG_ROAD, OPAQUE],
        }
    }

    fn vehicle(&self, id: ActorId) -> [u8; 4] {
        match self {
            RasterKind::Rgb => BODY_COLORS[id as usize % BODY_COLORS.len()],
            RasterKind::Semantic => [0, 0, TAG_CAR, OPAQUE],
            RasterKind::Instance => {
                let [low, high] = (id as u16).to_le_bytes();
                [high, low, TAG_CAR, OPAQUE]
            }
        }
    }
}

/// 像素矩形 [x0, x1) × [y0, y1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
}

/// 相机类传感器的渲染器
#[derive(Debug, Clone, Copy)]
pub struct CameraRenderer {
    kind: RasterKind,
    intrinsic: IntrinsicMatrix,
}

impl CameraRenderer {
    /// # Errors
    /// 图像尺寸或视场角非法时返回 [`SimulationError::InvalidSetting`]。
    pub fn new(kind: RasterKind, config: &CameraConfig) -> Result<Self> {
        let intrinsic = build_intrinsic(config.width, config.height, config.fov)
            .map_err(|e| SimulationError::invalid_setting("camera", e.to_string()))?;
        Ok(Self { kind, intrinsic })
    }

    pub fn kind(&self) -> RasterKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.intrinsic.width()
    }

    pub fn height(&self) -> u32 {
        self.intrinsic.height()
    }

    /// 从 `camera` 位姿渲染 `actors`，跳过 `hidden`（挂载车辆自身）
    pub fn render(&self, camera: &Transform, actors: &[ActorSnapshot], hidden: ActorId, out: &mut Vec<u8>) {
        let width = self.width() as usize;
        let height = self.height() as usize;
        out.resize(width * height * 4, 0);

        let horizon = self.horizon_row(camera);
        let sky = self.kind.sky();
        let road = self.kind.road();
        for (row, line) in out.chunks_exact_mut(width * 4).enumerate() {
            let color = if row < horizon { sky } else { road };
            for pixel in line.chunks_exact_mut(4) {
                pixel.copy_from_slice(&color);
            }
        }

        let world_to_camera = inverse_matrix(camera);
        let mut visible: Vec<(f64, ActorId, PixelRect)> = actors
            .iter()
            .filter(|actor| actor.id != hidden)
            .filter_map(|actor| {
                let rect = self.rectangle(actor, &world_to_camera)?;
                Some((camera.location.distance(&actor.transform.location), actor.id, rect))
            })
            .collect();

        // 远处先画，近处覆盖
        visible.sort_by(|a, b| b.0.total_cmp(&a.0));
        for (_, id, rect) in visible {
            fill(out, width, rect, self.kind.vehicle(id));
        }
    }

    fn horizon_row(&self, camera: &Transform) -> usize {
        let center = self.intrinsic.principal_point().y;
        let row = center + self.intrinsic.focal() * camera.rotation.pitch.to_radians().tan();
        row.clamp(0.0, self.height() as f64) as usize
    }

    /// 投影矩形裁剪到图像内；任一顶点位于成像平面之后则不可见
    fn rectangle(&self, actor: &ActorSnapshot, world_to_camera: &nalgebra::Matrix4<f64>) -> Option<PixelRect> {
        let mut xmin = f64::INFINITY;
        let mut ymin = f64::INFINITY;
        let mut xmax = f64::NEG_INFINITY;
        let mut ymax = f64::NEG_INFINITY;
        for vertex in world_vertices(actor) {
            let (pixel, depth) = project_with_depth(&vertex, &self.intrinsic, world_to_camera);
            if depth <= 0.0 {
                return None;
            }
            xmin = xmin.min(pixel.x);
            ymin = ymin.min(pixel.y);
            xmax = xmax.max(pixel.x);
            ymax = ymax.max(pixel.y);
        }

        let width = self.width() as f64;
        let height = self.height() as f64;
        let rect = PixelRect {
            x0: xmin.clamp(0.0, width) as usize,
            y0: ymin.clamp(0.0, height) as usize,
            x1: xmax.ceil().clamp(0.0, width) as usize,
            y1: ymax.ceil().clamp(0.0, height) as usize,
        };
        (rect.x0 < rect.x1 && rect.y0 < rect.y1).then_some(rect)
    }
}

fn fill(out: &mut [u8], width: usize, rect: PixelRect, color: [u8; 4]) {
    for row in rect.y0..rect.y1 {
        let start = (row * width + rect.x0) * 4;
        let end = (row * width + rect.x1) * 4;
        for pixel in out[start..end].chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }
}

/// 单轴噪声：偏置加可选的高斯项
#[derive(Debug, Clone, Copy)]
struct AxisNoise {
    bias: f64,
    normal: Option<Normal<f64>>,
}

impl AxisNoise {
    fn new(field: &str, bias: f64, stddev: f64) -> Result<Self> {
        if stddev == 0.0 {
            return Ok(Self { bias, normal: None });
        }
        let normal = Normal::new(bias, stddev)
            .map_err(|e| SimulationError::invalid_setting(format!("sensors.gnss.noise.{field}"), e.to_string()))?;
        Ok(Self {
            bias,
            normal: Some(normal),
        })
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        match &self.normal {
            Some(normal) => normal.sample(rng),
            None => self.bias,
        }
    }
}

/// GNSS 渲染器
#[derive(Debug, Clone)]
pub struct GnssRenderer {
    georeference: GeoLocation,
    exact: bool,
    latitude: AxisNoise,
    longitude: AxisNoise,
    altitude: AxisNoise,
    rng: StdRng,
}

impl GnssRenderer {
    pub fn new(georeference: GeoLocation, config: &GnssConfig, seed: u64) -> Result<Self> {
        let noise = config.noise;
        Ok(Self {
            georeference,
            exact: noise.is_zero(),
            latitude: AxisNoise::new("lat_stddev", noise.lat_bias, noise.lat_stddev)?,
            longitude: AxisNoise::new("lon_stddev", noise.lon_bias, noise.lon_stddev)?,
            altitude: AxisNoise::new("alt_stddev", noise.alt_bias, noise.alt_stddev)?,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// 一次测量
    pub fn measure(&mut self, location: &Location) -> GeoLocation {
        let exact = geodesy::to_geolocation(&self.georeference, location);
        if self.exact {
            return exact;
        }
        GeoLocation {
            latitude: exact.latitude + self.latitude.sample(&mut self.rng),
            longitude: exact.longitude + self.longitude.sample(&mut self.rng),
            altitude: exact.altitude + self.altitude.sample(&mut self.rng),
        }
    }
}

/// 任一传感器的渲染器
#[derive(Debug, Clone)]
pub enum Renderer {
    Camera(CameraRenderer),
    Gnss(GnssRenderer),
}

impl Renderer {
    /// 按生成规格构建
    pub fn for_spec(spec: &SensorSpec, georeference: GeoLocation, seed: u64) -> Result<Self> {
        match spec {
            SensorSpec::Gnss(config) => Ok(Renderer::Gnss(GnssRenderer::new(georeference, config, seed)?)),
            SensorSpec::Camera(config) | SensorSpec::Semantic(config) | SensorSpec::Instance(config) => {
                let kind = RasterKind::for_channel(spec.channel())
                    .ok_or_else(|| SimulationError::spawn(spec.blueprint_id(), "not a camera"))?;
                Ok(Renderer::Camera(CameraRenderer::new(kind, config)?))
            }
        }
    }
}
