//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Uses simulation timestamp (seconds, f64) as the sample clock
//! - `frame_number` is unique per tick and is the only correlation key between channels

mod annotation;
mod blueprint;
mod channel;
mod error;
mod runtime;
mod sensor;
mod storage;
mod sync;
mod world;

pub use annotation::*;
pub use blueprint::*;
pub use channel::*;
pub use error::*;
pub use runtime::*;
pub use sensor::*;
pub use storage::{LocalStorage, Storage};
pub use sync::*;
pub use world::{SensorDataCallback, World};
