//! DatasetBlueprint - Config Loader 输出
//!
//! 描述一次采集的完整配置：世界、自车、传感器、采集节奏、录制输出。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Channel, GeoLocation, Location, Transform};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的采集配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 世界设置
    pub world: WorldConfig,

    /// 自车设置
    #[serde(default)]
    pub ego: EgoConfig,

    /// 传感器设置
    #[serde(default)]
    pub sensors: SensorsConfig,

    /// 采集节奏
    #[serde(default)]
    pub collection: CollectionConfig,

    /// 录制输出
    #[serde(default)]
    pub recorder: RecorderConfig,
}

/// 世界配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// 地图名称 (e.g., "Town10HD")，同时作为输出子目录与文件名前缀
    pub map: String,

    /// 固定步长 (秒)
    #[serde(default = "default_delta_seconds")]
    pub delta_seconds: f64,

    /// 同步模式
    #[serde(default = "default_true")]
    pub sync_mode: bool,

    /// 随机种子 (交通生成)
    #[serde(default)]
    pub seed: Option<u64>,

    /// 地图原点对应的大地坐标
    #[serde(default)]
    pub georeference: GeoLocation,

    /// 背景车辆数量
    #[serde(default = "default_traffic_vehicles")]
    pub traffic_vehicles: usize,

    /// 初始帧序号
    #[serde(default)]
    pub start_frame: u64,
}

fn default_delta_seconds() -> f64 {
    0.05
}

fn default_true() -> bool {
    true
}

fn default_traffic_vehicles() -> usize {
    30
}

/// 自车配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgoConfig {
    /// 蓝图名称 (e.g., "vehicle.tesla.model3")
    #[serde(default = "default_ego_blueprint")]
    pub blueprint: String,

    /// 初始位姿 (None = 由世界选择)
    #[serde(default)]
    pub spawn_point: Option<Transform>,
}

impl Default for EgoConfig {
    fn default() -> Self {
        Self {
            blueprint: default_ego_blueprint(),
            spawn_point: None,
        }
    }
}

fn default_ego_blueprint() -> String {
    "vehicle.tesla.model3".to_string()
}

/// 四个通道的传感器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorsConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub semantic: CameraConfig,
    #[serde(default)]
    pub instance: CameraConfig,
    #[serde(default)]
    pub gnss: GnssConfig,
}

impl SensorsConfig {
    /// 按通道顺序展开为生成规格
    pub fn specs(&self) -> [SensorSpec; 4] {
        [
            SensorSpec::Camera(self.camera.clone()),
            SensorSpec::Semantic(self.semantic.clone()),
            SensorSpec::Instance(self.instance.clone()),
            SensorSpec::Gnss(self.gnss.clone()),
        ]
    }
}

/// 相机配置 (RGB / 语义 / 实例共用)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// 图像宽度 (像素)
    #[serde(default = "default_image_width")]
    pub width: u32,

    /// 图像高度 (像素)
    #[serde(default = "default_image_height")]
    pub height: u32,

    /// 水平视场角 (度)
    #[serde(default = "default_fov")]
    pub fov: f64,

    /// 相对于自车的挂载位姿
    #[serde(default = "default_sensor_transform")]
    pub transform: Transform,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: default_image_width(),
            height: default_image_height(),
            fov: default_fov(),
            transform: default_sensor_transform(),
        }
    }
}

fn default_image_width() -> u32 {
    2048
}

fn default_image_height() -> u32 {
    1024
}

fn default_fov() -> f64 {
    70.0
}

fn default_sensor_transform() -> Transform {
    Transform::from_location(Location::new(1.5, 0.0, 2.4))
}

/// GNSS 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GnssConfig {
    /// 相对于自车的挂载位姿
    #[serde(default = "default_sensor_transform")]
    pub transform: Transform,

    /// 噪声参数
    #[serde(default)]
    pub noise: GnssNoise,
}

impl Default for GnssConfig {
    fn default() -> Self {
        Self {
            transform: default_sensor_transform(),
            noise: GnssNoise::default(),
        }
    }
}

/// GNSS 噪声 (偏置 + 高斯标准差)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GnssNoise {
    #[serde(default)]
    pub lat_bias: f64,
    #[serde(default)]
    pub lat_stddev: f64,
    #[serde(default)]
    pub lon_bias: f64,
    #[serde(default)]
    pub lon_stddev: f64,
    #[serde(default)]
    pub alt_bias: f64,
    #[serde(default)]
    pub alt_stddev: f64,
}

impl GnssNoise {
    /// 是否完全无噪声
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// 传感器生成规格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum SensorSpec {
    Camera(CameraConfig),
    Semantic(CameraConfig),
    Instance(CameraConfig),
    Gnss(GnssConfig),
}

impl SensorSpec {
    /// 对应通道
    pub fn channel(&self) -> Channel {
        match self {
            SensorSpec::Camera(_) => Channel::Camera,
            SensorSpec::Semantic(_) => Channel::Semantic,
            SensorSpec::Instance(_) => Channel::Instance,
            SensorSpec::Gnss(_) => Channel::Gnss,
        }
    }

    /// 模拟器蓝图名称
    pub fn blueprint_id(&self) -> &'static str {
        match self {
            SensorSpec::Camera(_) => "sensor.camera.rgb",
            SensorSpec::Semantic(_) => "sensor.camera.semantic_segmentation",
            SensorSpec::Instance(_) => "sensor.camera.instance_segmentation",
            SensorSpec::Gnss(_) => "sensor.other.gnss",
        }
    }

    /// 挂载位姿
    pub fn transform(&self) -> Transform {
        match self {
            SensorSpec::Camera(c) | SensorSpec::Semantic(c) | SensorSpec::Instance(c) => {
                c.transform
            }
            SensorSpec::Gnss(g) => g.transform,
        }
    }

    /// 相机参数 (GNSS 为 None)
    pub fn camera(&self) -> Option<&CameraConfig> {
        match self {
            SensorSpec::Camera(c) | SensorSpec::Semantic(c) | SensorSpec::Instance(c) => Some(c),
            SensorSpec::Gnss(_) => None,
        }
    }
}

/// 采集节奏配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// 每隔多少帧录制一次 (frame_number % stride == 0)
    #[serde(default = "default_tick_stride")]
    pub tick_stride: u64,

    /// 单次 collect 的超时 (毫秒)
    #[serde(default = "default_collect_timeout_ms")]
    pub collect_timeout_ms: u64,

    /// 标注距离上限 (米)
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,

    /// 最大 tick 数 (None = 直到中断)
    #[serde(default)]
    pub max_ticks: Option<u64>,

    /// 是否计算 2D 框
    #[serde(default = "default_true")]
    pub annotate: bool,

    /// 每个通道的队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 队列满时的丢弃策略
    #[serde(default)]
    pub drop_policy: DropPolicy,
}

impl CollectionConfig {
    /// collect 超时
    pub fn collect_timeout(&self) -> Duration {
        Duration::from_millis(self.collect_timeout_ms)
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            tick_stride: default_tick_stride(),
            collect_timeout_ms: default_collect_timeout_ms(),
            max_distance: default_max_distance(),
            max_ticks: None,
            annotate: true,
            queue_capacity: default_queue_capacity(),
            drop_policy: DropPolicy::default(),
        }
    }
}

fn default_tick_stride() -> u64 {
    100
}

fn default_collect_timeout_ms() -> u64 {
    1000
}

fn default_max_distance() -> f64 {
    500.0
}

fn default_queue_capacity() -> usize {
    4
}

/// 丢包策略 (背压满时)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// 丢弃最旧的样本
    #[default]
    DropOldest,
    /// 丢弃最新的样本
    DropNewest,
}

/// 录制配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// 输出根目录 (每个地图一个子目录)
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,

    /// 缓冲帧数上限
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            capacity: default_capacity(),
        }
    }
}

fn default_save_path() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_capacity() -> usize {
    8
}

impl DatasetBlueprint {
    /// 以默认值构造指定地图的蓝图
    pub fn for_map(map: impl Into<String>) -> Self {
        Self {
            version: ConfigVersion::V1,
            world: WorldConfig {
                map: map.into(),
                delta_seconds: default_delta_seconds(),
                sync_mode: true,
                seed: None,
                georeference: GeoLocation::default(),
                traffic_vehicles: default_traffic_vehicles(),
                start_frame: 0,
            },
            ego: EgoConfig::default(),
            sensors: SensorsConfig::default(),
            collection: CollectionConfig::default(),
            recorder: RecorderConfig::default(),
        }
    }

    /// 录制输出目录 (save_path/map)
    pub fn output_dir(&self) -> PathBuf {
        self.recorder.save_path.join(&self.world.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_collector_settings() {
        let blueprint = DatasetBlueprint::for_map("Town10HD");
        assert_eq!(blueprint.recorder.capacity, 8);
        assert_eq!(blueprint.collection.tick_stride, 100);
        assert_eq!(blueprint.sensors.camera.width, 2048);
        assert_eq!(blueprint.sensors.camera.height, 1024);
        assert_eq!(blueprint.sensors.camera.fov, 70.0);
        assert_eq!(blueprint.sensors.gnss.transform.location.z, 2.4);
        assert_eq!(blueprint.world.delta_seconds, 0.05);
        assert_eq!(
            blueprint.output_dir(),
            PathBuf::from("outputs").join("Town10HD")
        );
    }

    #[test]
    fn specs_follow_channel_order() {
        let sensors = SensorsConfig::default();
        let channels: Vec<_> = sensors.specs().iter().map(SensorSpec::channel).collect();
        assert_eq!(channels, Channel::ALL.to_vec());
        assert_eq!(sensors.specs()[3].blueprint_id(), "sensor.other.gnss");
        assert!(sensors.specs()[3].camera().is_none());
    }

    #[test]
    fn minimal_json_fills_defaults() {
        let json = r#"{ "world": { "map": "Town01" } }"#;
        let blueprint: DatasetBlueprint = serde_json::from_str(json).unwrap();
        assert_eq!(blueprint.world.map, "Town01");
        assert_eq!(blueprint.collection.collect_timeout(), Duration::from_secs(1));
        assert_eq!(blueprint.collection.drop_policy, DropPolicy::DropOldest);
        assert!(blueprint.collection.annotate);
    }
}
