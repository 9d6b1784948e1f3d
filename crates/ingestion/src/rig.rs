//! Sensor rig
//!
//! Spawns the four channel sensors onto the ego vehicle and tears them down.

use std::sync::Arc;

use contracts::{ActorId, Channel, ContractError, SensorSpec, SensorsConfig, Transform, World};
use tracing::{debug, info, instrument, warn};

use crate::channel::SensorChannel;
use crate::config::{BackpressureConfig, MetricsSnapshot};
use crate::error::{IngestionError, Result};
use crate::sensor::{CameraSensor, Sensor};

/// Sensors attached to one parent actor, kept in channel order
pub struct SensorRig {
    parent: ActorId,
    sensors: Vec<Sensor>,
}

impl SensorRig {
    /// Spawn every sensor of `config` on `parent`
    #[instrument(name = "rig_spawn", skip(world, config, backpressure))]
    pub async fn spawn<W: World>(
        world: &W,
        config: &SensorsConfig,
        parent: ActorId,
        backpressure: &BackpressureConfig,
    ) -> Result<Self> {
        Self::spawn_specs(world, &config.specs(), parent, backpressure).await
    }

    /// Spawn an explicit set of sensors
    ///
    /// On failure the sensors spawned so far are destroyed before returning.
    pub async fn spawn_specs<W: World>(
        world: &W,
        specs: &[SensorSpec],
        parent: ActorId,
        backpressure: &BackpressureConfig,
    ) -> Result<Self> {
        let mut rig = Self {
            parent,
            sensors: Vec::with_capacity(specs.len()),
        };

        for spec in specs {
            let channel = spec.channel();
            if rig.sensor(channel).is_some() {
                rig.destroy_all(world).await;
                return Err(IngestionError::DuplicateChannel { channel });
            }

            match Sensor::spawn(world, spec, parent, backpressure).await {
                Ok(sensor) => rig.sensors.push(sensor),
                Err(e) => {
                    warn!(channel = %channel, error = %e, "sensor spawn failed, rolling back rig");
                    rig.destroy_all(world).await;
                    return Err(e);
                }
            }
        }

        rig.sensors.sort_by_key(Sensor::channel_kind);
        info!(parent, count = rig.sensors.len(), "sensor rig ready");
        Ok(rig)
    }

    /// Parent actor
    pub fn parent(&self) -> ActorId {
        self.parent
    }

    /// Sensors in channel order
    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Sensor feeding `channel`
    pub fn sensor(&self, channel: Channel) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.channel_kind() == channel)
    }

    /// Hand-off channels, one per sensor
    pub fn channels(&self) -> Vec<Arc<SensorChannel>> {
        self.sensors.iter().map(Sensor::channel).collect()
    }

    /// The RGB camera, if attached
    pub fn camera(&self) -> Option<&CameraSensor> {
        self.sensors.iter().find_map(Sensor::as_camera)
    }

    /// World pose of the RGB camera
    pub fn camera_transform<W: World>(&self, world: &W) -> std::result::Result<Transform, ContractError> {
        let camera = self
            .sensor(Channel::Camera)
            .ok_or_else(|| ContractError::Other("no camera attached to the rig".into()))?;
        world.actor_transform(camera.actor_id())
    }

    /// Number of sensors
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// No sensors attached
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Per-channel ingestion counters
    pub fn metrics(&self) -> Vec<(Channel, MetricsSnapshot)> {
        self.sensors
            .iter()
            .map(|s| (s.channel_kind(), s.channel().metrics().snapshot()))
            .collect()
    }

    /// Destroy every sensor, continuing past failures
    ///
    /// Returns the number of sensors that failed to tear down.
    #[instrument(name = "rig_destroy_all", skip(self, world), fields(parent = self.parent))]
    pub async fn destroy_all<W: World>(&mut self, world: &W) -> usize {
        let mut failures = 0;
        for sensor in self.sensors.iter_mut().rev() {
            if sensor.is_destroyed() {
                continue;
            }
            let channel = sensor.channel_kind();
            match sensor.destroy(world).await {
                Ok(()) => debug!(channel = %channel, "sensor released"),
                Err(e) => {
                    failures += 1;
                    warn!(channel = %channel, error = %e, "sensor teardown failed");
                }
            }
        }
        info!(failures, "sensor rig released");
        failures
    }
}
