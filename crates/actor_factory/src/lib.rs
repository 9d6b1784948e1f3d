//! # Actor Factory
//!
//! In-process simulated world implementing the `World` capability.
//!
//! Responsibilities:
//! - Spawn the ego vehicle and seeded background traffic
//! - Advance the fixed-step clock and actor kinematics on `tick`
//! - Attach sensors and run one producer thread per listening sensor
//! - Render BGRA camera rasters and GNSS readings
//! - Release every actor on shutdown

pub mod error;
pub mod geodesy;
pub mod producer;
pub mod render;
pub mod world;

pub use error::{Result, SimulationError};
pub use render::{RasterKind, Renderer, TAG_CAR, TAG_ROAD, TAG_SKY};
pub use world::SimulatedWorld;
