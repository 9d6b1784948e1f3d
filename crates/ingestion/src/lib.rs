//! # Ingestion
//!
//! Sensor data ingestion module.
//!
//! Responsibilities:
//! - Spawn the camera, semantic, instance and GNSS sensors on the ego vehicle
//! - Decode raw producer-thread deliveries into typed `Sample`s
//! - Bounded per-channel hand-off with a drop policy
//! - Release every sensor on shutdown
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{BackpressureConfig, SensorRig};
//!
//! let ego = world.ego()?;
//! let mut rig = SensorRig::spawn(&world, &blueprint.sensors, ego, &BackpressureConfig::default()).await?;
//! let channels = rig.channels();
//! // ... hand the channels to the frame synchronizer
//! rig.destroy_all(&world).await;
//! ```

mod adapters;
mod channel;
mod config;
mod error;
mod rig;
mod sensor;

#[cfg(test)]
mod testing;

// Re-exports
pub use adapters::{camera, gnss, instance, semantic, palette_color, CITYSCAPES_PALETTE};
pub use channel::SensorChannel;
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use error::{IngestionError, Result};
pub use rig::SensorRig;
pub use sensor::{CameraSensor, GnssSensor, InstanceSensor, SemanticSensor, Sensor};
