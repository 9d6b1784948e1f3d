//! Storage trait - Recorder output interface
//!
//! Durable persistence of named artifacts.

use crate::ContractError;

/// Artifact storage trait
///
/// All storage backends must implement this trait.
#[trait_variant::make(Storage: Send)]
pub trait LocalStorage {
    /// Human-readable location (used for logging/metrics)
    fn location(&self) -> String;

    /// Persist one named artifact, replacing any previous content
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn put(&mut self, name: &str, data: &[u8]) -> Result<(), ContractError>;
}
