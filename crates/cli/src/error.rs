//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parsing error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Collection run error
    #[error("Collection failed: {message}")]
    Collection { message: String },

    /// Dataset directory could not be read
    #[error("Cannot inspect dataset '{path}': {message}")]
    Dataset { path: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn collection(message: impl Into<String>) -> Self {
        Self::Collection {
            message: message.into(),
        }
    }

    pub fn dataset(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dataset {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::ConfigNotFound { .. } => 2,
            CliError::ConfigParse { .. } | CliError::ConfigValidation { .. } => 3,
            CliError::Collection { .. } => 4,
            CliError::Dataset { .. } => 5,
        }
    }
}

impl From<ContractError> for CliError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::ConfigParse { .. } => CliError::config_parse(err.to_string()),
            ContractError::ConfigValidation { .. } => CliError::config_validation(err.to_string()),
            other => CliError::collection(other.to_string()),
        }
    }
}

/// Exit status for an error returned by a command
///
/// Errors that carry no [`CliError`] exit with 1.
pub fn exit_code_of(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CliError>())
        .map_or(1, CliError::exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn contract_errors_map_to_config_kinds() {
        let parse: CliError = ContractError::config_parse("bad toml").into();
        assert_eq!(parse.exit_code(), 3);

        let invalid: CliError = ContractError::config_validation("world.map", "empty").into();
        assert!(matches!(invalid, CliError::ConfigValidation { ref message } if message.contains("world.map")));

        let other: CliError = ContractError::world_tick("stalled").into();
        assert_eq!(other.exit_code(), 4);
    }

    #[test]
    fn exit_code_found_through_context() {
        let err = Err::<(), _>(CliError::config_not_found("missing.toml"))
            .context("loading configuration")
            .unwrap_err();
        assert_eq!(exit_code_of(&err), 2);

        let plain = anyhow::anyhow!("something else");
        assert_eq!(exit_code_of(&plain), 1);
    }
}
