//! Simulated world error types

use contracts::{ActorId, ContractError};
use thiserror::Error;

/// SimulatedWorld specific error
#[derive(Debug, Error)]
pub enum SimulationError {
    /// World settings rejected at construction
    #[error("invalid world setting '{field}': {message}")]
    InvalidSetting { field: String, message: String },

    /// Actor spawn error
    #[error("failed to spawn '{blueprint}': {message}")]
    SpawnFailed { blueprint: String, message: String },

    /// Producer thread could not be started
    #[error("failed to start producer for sensor {sensor_id}: {source}")]
    Producer {
        sensor_id: ActorId,
        #[source]
        source: std::io::Error,
    },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl SimulationError {
    /// Create invalid setting error
    pub fn invalid_setting(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create spawn error
    pub fn spawn(blueprint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SpawnFailed {
            blueprint: blueprint.into(),
            message: message.into(),
        }
    }
}

impl From<SimulationError> for ContractError {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::InvalidSetting { field, message } => {
                ContractError::config_validation(field, message)
            }
            SimulationError::SpawnFailed { blueprint, message } => {
                ContractError::world_spawn(blueprint, message)
            }
            SimulationError::Producer { source, .. } => ContractError::Io(source),
            SimulationError::Contract(inner) => inner,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SimulationError>;
