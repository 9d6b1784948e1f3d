//! Layered error definitions
//!
//! Categorized by source: config / world / payload / storage

use thiserror::Error;

use crate::{ActorId, Channel};

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== World Errors =====
    /// World spawn error
    #[error("world spawn error for '{blueprint}': {message}")]
    WorldSpawn { blueprint: String, message: String },

    /// Actor not found in the world
    #[error("actor not found: {actor_id}")]
    ActorNotFound { actor_id: ActorId },

    /// World tick failed
    #[error("world tick failed: {message}")]
    WorldTick { message: String },

    // ===== Payload Errors =====
    /// Data parse error
    #[error("payload parse error for channel '{channel}': {message}")]
    PayloadParse { channel: Channel, message: String },

    /// Frame sealing error
    #[error("cannot seal frame: {message}")]
    FrameSeal { message: String },

    // ===== Storage Errors =====
    /// Storage write error
    #[error("storage '{location}' write error for '{name}': {message}")]
    StorageWrite {
        location: String,
        name: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create world spawn error
    pub fn world_spawn(blueprint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WorldSpawn {
            blueprint: blueprint.into(),
            message: message.into(),
        }
    }

    /// Create world tick error
    pub fn world_tick(message: impl Into<String>) -> Self {
        Self::WorldTick {
            message: message.into(),
        }
    }

    /// Create payload parse error
    pub fn payload_parse(channel: Channel, message: impl Into<String>) -> Self {
        Self::PayloadParse {
            channel,
            message: message.into(),
        }
    }

    /// Create frame seal error
    pub fn frame_seal(message: impl Into<String>) -> Self {
        Self::FrameSeal {
            message: message.into(),
        }
    }

    /// Create storage write error
    pub fn storage_write(
        location: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::StorageWrite {
            location: location.into(),
            name: name.into(),
            message: message.into(),
        }
    }
}
