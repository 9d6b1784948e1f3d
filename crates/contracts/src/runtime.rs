//! World state types
//!
//! Actor handles, poses and geodetic coordinates as reported by the World.
//! Conventions follow the simulator: left-handed axes (x forward, y right,
//! z up), meters, rotation in degrees.

use serde::{Deserialize, Serialize};

/// Simulator actor handle type
pub type ActorId = u32;

/// 3D position in meters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another location
    pub fn distance(&self, other: &Location) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Rotation in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub roll: f64,
}

impl Rotation {
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Location + rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub rotation: Rotation,
}

impl Transform {
    pub const fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }

    /// Pure translation
    pub const fn from_location(location: Location) -> Self {
        Self {
            location,
            rotation: Rotation::new(0.0, 0.0, 0.0),
        }
    }
}

/// Geodetic coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Meters
    pub altitude: f64,
}

/// Oriented 3D box in actor space
///
/// `location` is the box center relative to the actor origin and `extent`
/// holds half-sizes along each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3d {
    pub location: Location,
    pub extent: Location,
    #[serde(default)]
    pub rotation: Rotation,
}

/// Actor state captured after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    /// Actor handle
    pub id: ActorId,
    /// Blueprint id (e.g., "vehicle.tesla.model3")
    pub type_id: String,
    /// World pose
    pub transform: Transform,
    /// Box in actor space
    pub bounding_box: BoundingBox3d,
}

impl ActorSnapshot {
    /// First segment of the blueprint id
    pub fn class_name(&self) -> &str {
        self.type_id.split('.').next().unwrap_or(&self.type_id)
    }
}
