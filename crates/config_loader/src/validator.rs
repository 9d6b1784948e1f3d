//! 配置校验模块
//!
//! 校验规则：
//! - 地图名非空，固定步长 > 0
//! - 地理参考点在合法经纬度范围内
//! - 自车为 vehicle 蓝图
//! - 相机尺寸 > 0，0 < fov < 180
//! - GNSS 噪声标准差非负
//! - 采集节奏、队列与录制容量均为正

use contracts::{
    CameraConfig, CollectionConfig, ContractError, DatasetBlueprint, EgoConfig, GnssConfig,
    RecorderConfig, WorldConfig,
};

/// 校验 DatasetBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &DatasetBlueprint) -> Result<(), ContractError> {
    validate_world(&blueprint.world)?;
    validate_ego(&blueprint.ego)?;
    validate_camera("sensors.camera", &blueprint.sensors.camera)?;
    validate_camera("sensors.semantic", &blueprint.sensors.semantic)?;
    validate_camera("sensors.instance", &blueprint.sensors.instance)?;
    validate_gnss(&blueprint.sensors.gnss)?;
    validate_collection(&blueprint.collection)?;
    validate_recorder(&blueprint.recorder)?;
    Ok(())
}

/// 正的有限数
fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// 校验世界配置
pub fn validate_world(world: &WorldConfig) -> Result<(), ContractError> {
    if world.map.trim().is_empty() {
        return Err(ContractError::config_validation("world.map", "map name cannot be empty"));
    }
    if world.map.contains(['/', '\\']) {
        return Err(ContractError::config_validation(
            "world.map",
            format!("map name '{}' must not contain path separators", world.map),
        ));
    }
    if !positive(world.delta_seconds) {
        return Err(ContractError::config_validation(
            "world.delta_seconds",
            format!("delta_seconds must be > 0, got {}", world.delta_seconds),
        ));
    }

    let geo = &world.georeference;
    if !(-90.0..=90.0).contains(&geo.latitude) {
        return Err(ContractError::config_validation(
            "world.georeference.latitude",
            format!("latitude must be within [-90, 90], got {}", geo.latitude),
        ));
    }
    if !(-180.0..=180.0).contains(&geo.longitude) {
        return Err(ContractError::config_validation(
            "world.georeference.longitude",
            format!("longitude must be within [-180, 180], got {}", geo.longitude),
        ));
    }
    Ok(())
}

/// 校验自车配置
pub fn validate_ego(ego: &EgoConfig) -> Result<(), ContractError> {
    if !ego.blueprint.starts_with("vehicle.") {
        return Err(ContractError::config_validation(
            "ego.blueprint",
            format!("'{}' is not a vehicle blueprint", ego.blueprint),
        ));
    }
    Ok(())
}

/// 校验相机配置
pub fn validate_camera(field: &str, camera: &CameraConfig) -> Result<(), ContractError> {
    if camera.width == 0 || camera.height == 0 {
        return Err(ContractError::config_validation(
            format!("{field}.width/height"),
            format!("image size must be positive, got {}x{}", camera.width, camera.height),
        ));
    }
    if !(camera.fov > 0.0 && camera.fov < 180.0) {
        return Err(ContractError::config_validation(
            format!("{field}.fov"),
            format!("fov must be within (0, 180), got {}", camera.fov),
        ));
    }
    Ok(())
}

/// 校验 GNSS 噪声
pub fn validate_gnss(gnss: &GnssConfig) -> Result<(), ContractError> {
    let noise = &gnss.noise;
    for (name, stddev) in [
        ("lat_stddev", noise.lat_stddev),
        ("lon_stddev", noise.lon_stddev),
        ("alt_stddev", noise.alt_stddev),
    ] {
        if !(stddev.is_finite() && stddev >= 0.0) {
            return Err(ContractError::config_validation(
                format!("sensors.gnss.noise.{name}"),
                format!("standard deviation must be >= 0, got {stddev}"),
            ));
        }
    }
    Ok(())
}

/// 校验采集节奏
pub fn validate_collection(collection: &CollectionConfig) -> Result<(), ContractError> {
    if collection.tick_stride == 0 {
        return Err(ContractError::config_validation(
            "collection.tick_stride",
            "tick_stride must be > 0",
        ));
    }
    if collection.collect_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "collection.collect_timeout_ms",
            "collect_timeout_ms must be > 0",
        ));
    }
    if !positive(collection.max_distance) {
        return Err(ContractError::config_validation(
            "collection.max_distance",
            format!("max_distance must be > 0, got {}", collection.max_distance),
        ));
    }
    if collection.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "collection.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    if collection.max_ticks == Some(0) {
        return Err(ContractError::config_validation(
            "collection.max_ticks",
            "max_ticks must be > 0 when set",
        ));
    }
    Ok(())
}

/// 校验录制配置
pub fn validate_recorder(recorder: &RecorderConfig) -> Result<(), ContractError> {
    if recorder.capacity == 0 {
        return Err(ContractError::config_validation(
            "recorder.capacity",
            "capacity must be > 0",
        ));
    }
    if recorder.save_path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "recorder.save_path",
            "save_path cannot be empty",
        ));
    }
    Ok(())
}
