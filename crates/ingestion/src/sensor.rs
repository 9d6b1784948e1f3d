//! Sensor variants
//!
//! One variant per channel. Each owns the spawned actor and the channel its
//! producer callback feeds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    ActorId, CameraConfig, Channel, RawSensorData, Sample, SensorDataCallback,
    SensorSpec, World,
};
use geometry::{build_intrinsic, GeodeticTransform, IntrinsicMatrix};
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{camera, gnss, instance, semantic};
use crate::channel::SensorChannel;
use crate::config::BackpressureConfig;
use crate::error::{IngestionError, Result};

/// Spawned sensor actor plus its hand-off channel
struct SensorHandle {
    actor_id: ActorId,
    channel: Arc<SensorChannel>,
    listening: Arc<AtomicBool>,
    destroyed: bool,
}

impl SensorHandle {
    async fn attach<W, F>(
        world: &W,
        spec: &SensorSpec,
        parent: ActorId,
        backpressure: &BackpressureConfig,
        decode: F,
    ) -> Result<Self>
    where
        W: World,
        F: Fn(&RawSensorData) -> Result<Sample> + Send + Sync + 'static,
    {
        let kind = spec.channel();
        let actor_id = world.spawn_sensor(spec, parent).await?;
        let channel = Arc::new(SensorChannel::new(kind, backpressure));
        let listening = Arc::new(AtomicBool::new(true));

        let callback: SensorDataCallback = {
            let channel = channel.clone();
            let listening = listening.clone();
            Arc::new(move |raw: &RawSensorData| {
                if !listening.load(Ordering::Relaxed) {
                    return;
                }
                match decode(raw) {
                    Ok(sample) => channel.push(sample),
                    Err(e) => {
                        channel.metrics().record_parse_error();
                        counter!("carla_dataset_parse_errors_total", "channel" => kind.as_str())
                            .increment(1);
                        warn!(channel = %kind, frame = raw.frame, error = %e, "sample discarded");
                    }
                }
            })
        };

        if let Err(e) = world.listen(actor_id, callback) {
            warn!(channel = %kind, actor_id, error = %e, "listen failed, rolling back spawn");
            if let Err(destroy_err) = world.destroy_actor(actor_id).await {
                warn!(actor_id, error = %destroy_err, "rollback destroy failed");
            }
            return Err(e.into());
        }

        debug!(channel = %kind, actor_id, "sensor listening");
        Ok(Self {
            actor_id,
            channel,
            listening,
            destroyed: false,
        })
    }

    async fn update(&self, timeout: Duration) -> Result<Sample> {
        if self.destroyed {
            return Err(IngestionError::SensorDestroyed {
                channel: self.channel.kind(),
                actor_id: self.actor_id,
            });
        }
        self.channel.pop(timeout).await
    }

    async fn destroy<W: World>(&mut self, world: &W) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        if self.listening.swap(false, Ordering::SeqCst) {
            world.stop(self.actor_id)?;
        }
        world.destroy_actor(self.actor_id).await?;
        self.channel.close();
        self.destroyed = true;
        debug!(channel = %self.channel.kind(), actor_id = self.actor_id, "sensor destroyed");
        Ok(())
    }
}

/// RGB camera with its intrinsic matrix
pub struct CameraSensor {
    handle: SensorHandle,
    config: CameraConfig,
    intrinsic: IntrinsicMatrix,
}

impl CameraSensor {
    /// Camera settings
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Intrinsic matrix built at spawn
    pub fn intrinsic(&self) -> &IntrinsicMatrix {
        &self.intrinsic
    }
}

/// Semantic segmentation camera
pub struct SemanticSensor {
    handle: SensorHandle,
}

/// Instance segmentation camera
pub struct InstanceSensor {
    handle: SensorHandle,
}

/// GNSS receiver; local coordinates come from the calibration captured at spawn
pub struct GnssSensor {
    handle: SensorHandle,
}

/// Sensor, one variant per channel
pub enum Sensor {
    Camera(CameraSensor),
    Semantic(SemanticSensor),
    Instance(InstanceSensor),
    Gnss(GnssSensor),
}

impl Sensor {
    /// Spawn a sensor on `parent` and start listening
    ///
    /// Camera intrinsics and the GNSS calibration are computed before the
    /// actor is spawned, so invalid settings fail without side effects.
    #[instrument(
        name = "sensor_spawn",
        skip(world, spec, backpressure),
        fields(channel = %spec.channel())
    )]
    pub async fn spawn<W: World>(
        world: &W,
        spec: &SensorSpec,
        parent: ActorId,
        backpressure: &BackpressureConfig,
    ) -> Result<Self> {
        let sensor = match spec {
            SensorSpec::Camera(config) => {
                let intrinsic = camera_intrinsic(config)?;
                let handle =
                    SensorHandle::attach(world, spec, parent, backpressure, camera::decode).await?;
                Sensor::Camera(CameraSensor {
                    handle,
                    config: config.clone(),
                    intrinsic,
                })
            }
            SensorSpec::Semantic(config) => {
                camera_intrinsic(config)?;
                let handle =
                    SensorHandle::attach(world, spec, parent, backpressure, semantic::decode)
                        .await?;
                Sensor::Semantic(SemanticSensor { handle })
            }
            SensorSpec::Instance(config) => {
                camera_intrinsic(config)?;
                let handle =
                    SensorHandle::attach(world, spec, parent, backpressure, instance::decode)
                        .await?;
                Sensor::Instance(InstanceSensor { handle })
            }
            SensorSpec::Gnss(_) => Sensor::Gnss(spawn_gnss(world, spec, parent, backpressure).await?),
        };

        info!(actor_id = sensor.actor_id(), "sensor spawned");
        Ok(sensor)
    }

    /// Channel this sensor feeds
    pub fn channel_kind(&self) -> Channel {
        match self {
            Sensor::Camera(_) => Channel::Camera,
            Sensor::Semantic(_) => Channel::Semantic,
            Sensor::Instance(_) => Channel::Instance,
            Sensor::Gnss(_) => Channel::Gnss,
        }
    }

    /// Wait up to `timeout` for this sensor's next sample
    pub async fn update(&self, timeout: Duration) -> Result<Sample> {
        self.handle().update(timeout).await
    }

    /// Stop listening and destroy the actor; repeated calls are no-ops
    pub async fn destroy<W: World>(&mut self, world: &W) -> Result<()> {
        self.handle_mut().destroy(world).await
    }

    /// Sensor actor handle
    pub fn actor_id(&self) -> ActorId {
        self.handle().actor_id
    }

    /// Hand-off channel shared with the producer callback
    pub fn channel(&self) -> Arc<SensorChannel> {
        self.handle().channel.clone()
    }

    /// Whether `destroy` has completed
    pub fn is_destroyed(&self) -> bool {
        self.handle().destroyed
    }

    /// RGB camera details, if this is the RGB camera
    pub fn as_camera(&self) -> Option<&CameraSensor> {
        match self {
            Sensor::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    fn handle(&self) -> &SensorHandle {
        match self {
            Sensor::Camera(s) => &s.handle,
            Sensor::Semantic(s) => &s.handle,
            Sensor::Instance(s) => &s.handle,
            Sensor::Gnss(s) => &s.handle,
        }
    }

    fn handle_mut(&mut self) -> &mut SensorHandle {
        match self {
            Sensor::Camera(s) => &mut s.handle,
            Sensor::Semantic(s) => &mut s.handle,
            Sensor::Instance(s) => &mut s.handle,
            Sensor::Gnss(s) => &mut s.handle,
        }
    }
}

fn camera_intrinsic(config: &CameraConfig) -> Result<IntrinsicMatrix> {
    Ok(build_intrinsic(config.width, config.height, config.fov)?)
}

async fn spawn_gnss<W: World>(
    world: &W,
    spec: &SensorSpec,
    parent: ActorId,
    backpressure: &BackpressureConfig,
) -> Result<GnssSensor> {
    let geodetic = GeodeticTransform::from_world(world)?;
    let handle = SensorHandle::attach(world, spec, parent, backpressure, move |raw| {
        gnss::decode(raw, Some(&geodetic))
    })
    .await?;
    Ok(GnssSensor { handle })
}
