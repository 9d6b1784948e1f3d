//! 测试用 World
//!
//! 不产生任何数据，测试通过 `emit` 手动投递。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use contracts::{
    ActorId, ActorSnapshot, ContractError, GeoLocation, Location, RawSensorData,
    SensorDataCallback, SensorSpec, Transform, World,
};

pub(crate) struct FakeWorld {
    next_id: AtomicU32,
    fail_blueprint: Option<&'static str>,
    spawned: Mutex<Vec<ActorId>>,
    callbacks: Mutex<HashMap<ActorId, SensorDataCallback>>,
    destroyed: Mutex<Vec<ActorId>>,
}

impl FakeWorld {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1000),
            fail_blueprint: None,
            spawned: Mutex::new(Vec::new()),
            callbacks: Mutex::new(HashMap::new()),
            destroyed: Mutex::new(Vec::new()),
        }
    }

    /// Spawning `blueprint` fails
    pub(crate) fn failing_on(blueprint: &'static str) -> Self {
        Self {
            fail_blueprint: Some(blueprint),
            ..Self::new()
        }
    }

    pub(crate) fn emit(&self, sensor_id: ActorId, data: &RawSensorData) {
        let callback = self.callbacks.lock().unwrap().get(&sensor_id).cloned();
        if let Some(callback) = callback {
            callback(data);
        }
    }

    pub(crate) fn listening_count(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }

    pub(crate) fn spawned_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    pub(crate) fn destroyed(&self) -> Vec<ActorId> {
        self.destroyed.lock().unwrap().clone()
    }
}

impl World for FakeWorld {
    fn map_name(&self) -> &str {
        "Town10HD"
    }

    fn delta_seconds(&self) -> f64 {
        0.05
    }

    async fn tick(&self) -> Result<u64, ContractError> {
        Ok(0)
    }

    fn ego(&self) -> Result<ActorId, ContractError> {
        Ok(1)
    }

    fn actors(&self) -> Vec<ActorSnapshot> {
        Vec::new()
    }

    fn actor_transform(&self, actor_id: ActorId) -> Result<Transform, ContractError> {
        if self.spawned.lock().unwrap().contains(&actor_id) {
            Ok(Transform::default())
        } else {
            Err(ContractError::ActorNotFound { actor_id })
        }
    }

    // linear, so calibration is exact
    fn transform_to_geolocation(&self, location: &Location) -> GeoLocation {
        GeoLocation {
            latitude: -location.y * 1e-5,
            longitude: location.x * 1e-5,
            altitude: location.z,
        }
    }

    async fn spawn_sensor(&self, spec: &SensorSpec, _parent: ActorId) -> Result<ActorId, ContractError> {
        if self.fail_blueprint == Some(spec.blueprint_id()) {
            return Err(ContractError::world_spawn(spec.blueprint_id(), "spawn refused"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.spawned.lock().unwrap().push(id);
        Ok(id)
    }

    fn listen(&self, sensor_id: ActorId, callback: SensorDataCallback) -> Result<(), ContractError> {
        self.callbacks.lock().unwrap().insert(sensor_id, callback);
        Ok(())
    }

    fn stop(&self, sensor_id: ActorId) -> Result<(), ContractError> {
        self.callbacks.lock().unwrap().remove(&sensor_id);
        Ok(())
    }

    async fn destroy_actor(&self, actor_id: ActorId) -> Result<(), ContractError> {
        self.callbacks.lock().unwrap().remove(&actor_id);
        let mut destroyed = self.destroyed.lock().unwrap();
        if !destroyed.contains(&actor_id) {
            destroyed.push(actor_id);
        }
        Ok(())
    }
}
