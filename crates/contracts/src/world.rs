//! World capability
//!
//! The discrete simulation clock plus actor/sensor management. Components
//! receive the World explicitly; nothing holds simulator state globally.

use std::future::Future;
use std::sync::Arc;

use crate::{ActorId, ActorSnapshot, ContractError, GeoLocation, Location, RawSensorData, SensorSpec, Transform};

/// Sensor data callback type
///
/// Invoked on the simulator's producer thread. The data is borrowed from a
/// producer-owned buffer that may be reused once the callback returns.
pub type SensorDataCallback = Arc<dyn Fn(&RawSensorData) + Send + Sync>;

/// World trait
///
/// Implemented by the in-process simulated world and by any future simulator
/// bridge.
pub trait World: Send + Sync {
    /// Map name used for output naming
    fn map_name(&self) -> &str;

    /// Fixed step duration (seconds)
    fn delta_seconds(&self) -> f64;

    /// Advance exactly one fixed step
    ///
    /// Resolves once the step is complete and returns the new frame number.
    fn tick(&self) -> impl Future<Output = Result<u64, ContractError>> + Send;

    /// Ego actor carrying the sensors
    fn ego(&self) -> Result<ActorId, ContractError>;

    /// Vehicle actors currently alive, ego included
    fn actors(&self) -> Vec<ActorSnapshot>;

    /// World pose of an actor (attached sensors resolve through their parent)
    fn actor_transform(&self, actor_id: ActorId) -> Result<Transform, ContractError>;

    /// Map a local location to geodetic coordinates
    fn transform_to_geolocation(&self, location: &Location) -> GeoLocation;

    /// Spawn a sensor and attach it to `parent`
    ///
    /// # Returns
    /// Newly created sensor actor ID
    fn spawn_sensor(
        &self,
        spec: &SensorSpec,
        parent: ActorId,
    ) -> impl Future<Output = Result<ActorId, ContractError>> + Send;

    /// Register the data callback of a sensor
    ///
    /// Data produced by later ticks is delivered through `callback`.
    fn listen(&self, sensor_id: ActorId, callback: SensorDataCallback) -> Result<(), ContractError>;

    /// Stop delivering data for a sensor
    fn stop(&self, sensor_id: ActorId) -> Result<(), ContractError>;

    /// Destroy actor
    ///
    /// Idempotent operation: returns Ok if actor doesn't exist
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<(), ContractError>> + Send;
}
