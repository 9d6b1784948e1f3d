//! SimulatedWorld - 进程内的同步模拟世界
//!
//! 固定步长推进：自车与背景车辆沿环形道路匀速行驶，每个 tick 为每个正在监听
//! 的传感器派发一个渲染任务，由该传感器的生产者线程渲染并回调。

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    ActorId, ActorSnapshot, BoundingBox3d, Channel, ContractError, DatasetBlueprint, EgoConfig,
    GeoLocation, Location, Rotation, SensorDataCallback, SensorSpec, Transform, World, WorldConfig,
};
use geometry::{compose, forward_vector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{Result, SimulationError};
use crate::geodesy;
use crate::producer::{Producer, RenderJob};
use crate::render::Renderer;

/// 环形道路中心线半径 (米)
const RING_RADIUS: f64 = 120.0;
/// 车道宽度 (米)
const LANE_WIDTH: f64 = 3.5;
/// 自车速度 (m/s)
const EGO_SPEED: f64 = 8.0;
/// 前车与自车的间距 (米)
const LEAD_GAP: f64 = 20.0;
/// 首个 actor ID，便于与帧序号区分
const FIRST_ACTOR_ID: ActorId = 1000;

/// 背景车辆蓝图与半尺寸
const TRAFFIC_MODELS: [(&str, [f64; 3]); 6] = [
    ("vehicle.audi.a2", [1.85, 0.90, 0.78]),
    ("vehicle.citroen.c3", [1.99, 0.93, 0.77]),
    ("vehicle.lincoln.mkz_2020", [2.45, 1.07, 0.75]),
    ("vehicle.mini.cooper_s", [1.90, 0.97, 0.83]),
    ("vehicle.nissan.micra", [1.82, 0.90, 0.77]),
    ("vehicle.toyota.prius", [2.26, 1.00, 0.76]),
];
const EGO_EXTENT: [f64; 3] = [2.40, 1.08, 0.75];

/// 车辆运动模式
#[derive(Debug, Clone, Copy)]
enum Motion {
    /// 沿以原点为圆心的圆周逆时针行驶
    Ring { radius: f64, angle: f64, speed: f64 },
    /// 沿初始朝向直行
    Straight { speed: f64 },
}

#[derive(Debug, Clone)]
struct Vehicle {
    type_id: String,
    extent: Location,
    transform: Transform,
    motion: Motion,
}

impl Vehicle {
    fn on_ring(type_id: &str, extent: [f64; 3], radius: f64, angle: f64, speed: f64) -> Self {
        Self {
            type_id: type_id.to_string(),
            extent: Location::new(extent[0], extent[1], extent[2]),
            transform: ring_pose(radius, angle),
            motion: Motion::Ring { radius, angle, speed },
        }
    }

    fn straight(type_id: &str, extent: [f64; 3], transform: Transform, speed: f64) -> Self {
        Self {
            type_id: type_id.to_string(),
            extent: Location::new(extent[0], extent[1], extent[2]),
            transform,
            motion: Motion::Straight { speed },
        }
    }

    /// 同一运动模式下位于前方 `gap` 米处的车辆
    fn ahead(&self, type_id: &str, extent: [f64; 3], gap: f64) -> Self {
        match self.motion {
            Motion::Ring { radius, angle, speed } => {
                Self::on_ring(type_id, extent, radius, angle + gap / radius, speed)
            }
            Motion::Straight { speed } => {
                let forward = forward_vector(&self.transform.rotation) * gap;
                let mut transform = self.transform;
                transform.location.x += forward.x;
                transform.location.y += forward.y;
                Self::straight(type_id, extent, transform, speed)
            }
        }
    }

    fn advance(&mut self, dt: f64) {
        match &mut self.motion {
            Motion::Ring { radius, angle, speed } => {
                *angle = (*angle + *speed * dt / *radius) % TAU;
                self.transform = ring_pose(*radius, *angle);
            }
            Motion::Straight { speed } => {
                let step = forward_vector(&self.transform.rotation) * (*speed * dt);
                self.transform.location.x += step.x;
                self.transform.location.y += step.y;
                self.transform.location.z += step.z;
            }
        }
    }

    fn snapshot(&self, id: ActorId) -> ActorSnapshot {
        ActorSnapshot {
            id,
            type_id: self.type_id.clone(),
            transform: self.transform,
            bounding_box: BoundingBox3d {
                location: Location::new(0.0, 0.0, self.extent.z),
                extent: self.extent,
                rotation: Rotation::default(),
            },
        }
    }
}

/// 圆周上 `angle` 处、沿切线方向的位姿
fn ring_pose(radius: f64, angle: f64) -> Transform {
    let (sin, cos) = angle.sin_cos();
    Transform::new(
        Location::new(radius * cos, radius * sin, 0.0),
        Rotation::new(0.0, angle.to_degrees() + 90.0, 0.0),
    )
}

struct SimSensor {
    spec: SensorSpec,
    parent: ActorId,
    producer: Option<Producer>,
}

impl SimSensor {
    fn is_listening(&self) -> bool {
        self.producer.as_ref().is_some_and(Producer::is_listening)
    }
}

struct WorldState {
    frame: u64,
    elapsed: f64,
    next_id: ActorId,
    ego: Option<ActorId>,
    vehicles: BTreeMap<ActorId, Vehicle>,
    sensors: BTreeMap<ActorId, SimSensor>,
    muted: BTreeSet<Channel>,
}

impl WorldState {
    fn allocate(&mut self) -> ActorId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn snapshots(&self) -> Vec<ActorSnapshot> {
        self.vehicles
            .iter()
            .map(|(id, vehicle)| vehicle.snapshot(*id))
            .collect()
    }

    fn sensor_transform(&self, sensor: &SimSensor) -> Option<Transform> {
        let parent = self.vehicles.get(&sensor.parent)?;
        Some(compose(&parent.transform, &sensor.spec.transform()))
    }
}

/// 进程内模拟世界
pub struct SimulatedWorld {
    map: String,
    delta_seconds: f64,
    georeference: GeoLocation,
    seed: u64,
    state: Mutex<WorldState>,
}

impl SimulatedWorld {
    /// 按蓝图创建世界并生成自车与背景车辆
    pub fn from_blueprint(blueprint: &DatasetBlueprint) -> Result<Self> {
        Self::new(&blueprint.world, &blueprint.ego)
    }

    /// # Errors
    /// 地图名为空或步长非正时返回 [`SimulationError::InvalidSetting`]。
    #[instrument(
        name = "sim_world_new",
        skip(world, ego),
        fields(map = %world.map, traffic = world.traffic_vehicles)
    )]
    pub fn new(world: &WorldConfig, ego: &EgoConfig) -> Result<Self> {
        if world.map.trim().is_empty() {
            return Err(SimulationError::invalid_setting("world.map", "must not be empty"));
        }
        if !(world.delta_seconds.is_finite() && world.delta_seconds > 0.0) {
            return Err(SimulationError::invalid_setting(
                "world.delta_seconds",
                format!("must be positive, got {}", world.delta_seconds),
            ));
        }
        if !ego.blueprint.starts_with("vehicle.") {
            return Err(SimulationError::spawn(&ego.blueprint, "ego must be a vehicle blueprint"));
        }
        if !world.sync_mode {
            warn!("asynchronous mode is not simulated, ticking synchronously");
        }

        let seed = world.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        let ego_vehicle = match ego.spawn_point {
            Some(transform) => Vehicle::straight(&ego.blueprint, EGO_EXTENT, transform, EGO_SPEED),
            None => Vehicle::on_ring(&ego.blueprint, EGO_EXTENT, RING_RADIUS, 0.0, EGO_SPEED),
        };

        let mut state = WorldState {
            frame: world.start_frame,
            elapsed: 0.0,
            next_id: FIRST_ACTOR_ID,
            ego: None,
            vehicles: BTreeMap::new(),
            sensors: BTreeMap::new(),
            muted: BTreeSet::new(),
        };

        let mut traffic = Vec::with_capacity(world.traffic_vehicles);
        for index in 0..world.traffic_vehicles {
            let (type_id, extent) = TRAFFIC_MODELS[rng.random_range(0..TRAFFIC_MODELS.len())];
            let vehicle = if index == 0 {
                // 前车：与自车同车道同速
                ego_vehicle.ahead(type_id, extent, LEAD_GAP)
            } else {
                let lane = rng.random_range(-1i32..=1);
                let radius = RING_RADIUS + lane as f64 * LANE_WIDTH;
                let angle = rng.random_range(0.3..TAU - 0.1);
                let speed = rng.random_range(5.0..12.0);
                Vehicle::on_ring(type_id, extent, radius, angle, speed)
            };
            traffic.push(vehicle);
        }

        let ego_id = state.allocate();
        state.vehicles.insert(ego_id, ego_vehicle);
        state.ego = Some(ego_id);
        for vehicle in traffic {
            let id = state.allocate();
            state.vehicles.insert(id, vehicle);
        }

        info!(seed, ego = ego_id, vehicles = state.vehicles.len(), "simulated world ready");
        Ok(Self {
            map: world.map.clone(),
            delta_seconds: world.delta_seconds,
            georeference: world.georeference,
            seed,
            state: Mutex::new(state),
        })
    }

    fn state(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 当前帧序号
    pub fn frame(&self) -> u64 {
        self.state().frame
    }

    /// 自启动以来的仿真时间 (秒)
    pub fn elapsed_seconds(&self) -> f64 {
        self.state().elapsed
    }

    /// 实际使用的随机种子
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 存活的传感器数量
    pub fn sensor_count(&self) -> usize {
        self.state().sensors.len()
    }

    /// 正在监听的传感器数量
    pub fn listening_count(&self) -> usize {
        self.state().sensors.values().filter(|s| s.is_listening()).count()
    }

    /// 存活的车辆数量（含自车）
    pub fn vehicle_count(&self) -> usize {
        self.state().vehicles.len()
    }

    /// 静默某一通道：其传感器不再收到渲染任务
    pub fn mute_channel(&self, channel: Channel, muted: bool) {
        let mut state = self.state();
        if muted {
            state.muted.insert(channel);
        } else {
            state.muted.remove(&channel);
        }
        debug!(channel = %channel, muted, "channel mute changed");
    }

    /// 释放全部 actor：停止生产者线程，移除传感器、自车与背景车辆
    ///
    /// 返回释放的 actor 数量。
    #[instrument(name = "sim_world_shutdown", skip(self), fields(map = %self.map))]
    pub async fn shutdown(&self) -> usize {
        let (sensors, vehicles) = {
            let mut state = self.state();
            state.ego = None;
            (
                std::mem::take(&mut state.sensors),
                std::mem::take(&mut state.vehicles),
            )
        };

        let released = sensors.len() + vehicles.len();
        for (id, sensor) in sensors {
            if let Some(producer) = sensor.producer {
                join_producer(id, producer).await;
            }
        }
        info!(released, "world released");
        released
    }
}

async fn join_producer(sensor_id: ActorId, producer: Producer) {
    let Some(handle) = producer.finish() else {
        return;
    };
    match tokio::task::spawn_blocking(move || handle.join()).await {
        Ok(Ok(())) => trace!(sensor_id, "producer joined"),
        Ok(Err(_)) => warn!(sensor_id, "producer thread panicked"),
        Err(e) => warn!(sensor_id, error = %e, "producer join task failed"),
    }
}

impl World for SimulatedWorld {
    fn map_name(&self) -> &str {
        &self.map
    }

    fn delta_seconds(&self) -> f64 {
        self.delta_seconds
    }

    #[instrument(name = "sim_world_tick", level = "trace", skip(self))]
    async fn tick(&self) -> std::result::Result<u64, ContractError> {
        let frame = {
            let mut state = self.state();
            if state.ego.is_none() {
                return Err(ContractError::world_tick("world has been released"));
            }

            state.frame += 1;
            state.elapsed += self.delta_seconds;
            for vehicle in state.vehicles.values_mut() {
                vehicle.advance(self.delta_seconds);
            }

            let actors: Arc<[ActorSnapshot]> = state.snapshots().into();
            for (id, sensor) in &state.sensors {
                if state.muted.contains(&sensor.spec.channel()) {
                    continue;
                }
                let Some(producer) = sensor.producer.as_ref().filter(|p| p.is_listening()) else {
                    continue;
                };
                let Some(sensor_transform) = state.sensor_transform(sensor) else {
                    trace!(sensor_id = id, parent = sensor.parent, "parent gone, nothing rendered");
                    continue;
                };
                let job = RenderJob {
                    frame: state.frame,
                    timestamp: state.elapsed,
                    sensor_transform,
                    actors: actors.clone(),
                };
                if !producer.submit(job) {
                    warn!(sensor_id = id, "producer thread is gone");
                }
            }
            state.frame
        };

        tokio::task::yield_now().await;
        Ok(frame)
    }

    fn ego(&self) -> std::result::Result<ActorId, ContractError> {
        self.state()
            .ego
            .ok_or_else(|| ContractError::Other("world has no ego vehicle".into()))
    }

    fn actors(&self) -> Vec<ActorSnapshot> {
        self.state().snapshots()
    }

    fn actor_transform(&self, actor_id: ActorId) -> std::result::Result<Transform, ContractError> {
        let state = self.state();
        if let Some(vehicle) = state.vehicles.get(&actor_id) {
            return Ok(vehicle.transform);
        }
        state
            .sensors
            .get(&actor_id)
            .and_then(|sensor| state.sensor_transform(sensor))
            .ok_or(ContractError::ActorNotFound { actor_id })
    }

    fn transform_to_geolocation(&self, location: &Location) -> GeoLocation {
        geodesy::to_geolocation(&self.georeference, location)
    }

    #[instrument(
        name = "sim_world_spawn_sensor",
        skip(self, spec),
        fields(blueprint = spec.blueprint_id())
    )]
    async fn spawn_sensor(
        &self,
        spec: &SensorSpec,
        parent: ActorId,
    ) -> std::result::Result<ActorId, ContractError> {
        // 提前校验相机参数
        Renderer::for_spec(spec, self.georeference, self.seed)
            .map_err(|e| ContractError::world_spawn(spec.blueprint_id(), e.to_string()))?;

        let mut state = self.state();
        if !state.vehicles.contains_key(&parent) {
            return Err(ContractError::world_spawn(
                spec.blueprint_id(),
                format!("parent actor {} not found", parent),
            ));
        }

        let id = state.allocate();
        state.sensors.insert(
            id,
            SimSensor {
                spec: spec.clone(),
                parent,
                producer: None,
            },
        );
        debug!(sensor_id = id, "sensor attached");
        Ok(id)
    }

    fn listen(
        &self,
        sensor_id: ActorId,
        callback: SensorDataCallback,
    ) -> std::result::Result<(), ContractError> {
        let mut state = self.state();
        let sensor = state
            .sensors
            .get_mut(&sensor_id)
            .ok_or(ContractError::ActorNotFound { actor_id: sensor_id })?;

        // 幂等：已在监听则保持原回调
        if sensor.is_listening() {
            debug!(sensor_id, "already listening");
            return Ok(());
        }

        let seed = self.seed ^ u64::from(sensor_id);
        let renderer = Renderer::for_spec(&sensor.spec, self.georeference, seed)?;
        let producer = Producer::start(sensor_id, sensor.spec.channel(), sensor.parent, renderer, callback)?;
        sensor.producer = Some(producer);
        debug!(sensor_id, channel = %sensor.spec.channel(), "listening");
        Ok(())
    }

    fn stop(&self, sensor_id: ActorId) -> std::result::Result<(), ContractError> {
        let mut state = self.state();
        let sensor = state
            .sensors
            .get_mut(&sensor_id)
            .ok_or(ContractError::ActorNotFound { actor_id: sensor_id })?;
        if let Some(producer) = sensor.producer.as_mut() {
            producer.close();
        }
        debug!(sensor_id, "stopped");
        Ok(())
    }

    #[instrument(name = "sim_world_destroy_actor", skip(self))]
    async fn destroy_actor(&self, actor_id: ActorId) -> std::result::Result<(), ContractError> {
        let producer = {
            let mut state = self.state();
            if let Some(sensor) = state.sensors.remove(&actor_id) {
                sensor.producer
            } else {
                if state.vehicles.remove(&actor_id).is_some() && state.ego == Some(actor_id) {
                    state.ego = None;
                }
                None
            }
        };

        // 幂等：不存在的 actor 直接返回 Ok
        if let Some(producer) = producer {
            join_producer(actor_id, producer).await;
        }
        Ok(())
    }
}
