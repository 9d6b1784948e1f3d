//! Storage backends: a flat output directory and an in-memory store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use contracts::{ContractError, Storage};
use tracing::{debug, error, instrument};

use crate::error::{RecorderError, Result};

/// Writes artifacts as files directly under one directory
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    /// Create the directory (and parents) if missing
    ///
    /// # Errors
    /// [`RecorderError::OutputDir`] when the directory cannot be created.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| RecorderError::output_dir(root.display().to_string(), e.to_string()))?;
        debug!(root = %root.display(), "output directory ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for DirectoryStorage {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    #[instrument(
        name = "directory_storage_put",
        level = "trace",
        skip(self, data),
        fields(bytes = data.len())
    )]
    async fn put(&mut self, name: &str, data: &[u8]) -> std::result::Result<(), ContractError> {
        let path = self.root.join(name);
        tokio::fs::write(&path, data).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "write failed");
            ContractError::storage_write(self.location(), name, e.to_string())
        })
    }
}

/// Keeps artifacts in memory, keyed by name
///
/// Can be told to refuse one artifact to exercise failure paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    artifacts: BTreeMap<String, Vec<u8>>,
    refuse_suffix: Option<String>,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every artifact whose name ends with `suffix`
    pub fn refusing(suffix: impl Into<String>) -> Self {
        Self {
            refuse_suffix: Some(suffix.into()),
            ..Self::default()
        }
    }

    /// Accept everything from now on
    pub fn stop_refusing(&mut self) {
        self.refuse_suffix = None;
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.artifacts.get(name).map(Vec::as_slice)
    }

    /// Stored names in lexical order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Successful `put` calls, overwrites included
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Storage for MemoryStorage {
    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn put(&mut self, name: &str, data: &[u8]) -> std::result::Result<(), ContractError> {
        if let Some(suffix) = &self.refuse_suffix {
            if name.ends_with(suffix.as_str()) {
                return Err(ContractError::storage_write("memory", name, "refused"));
            }
        }
        self.artifacts.insert(name.to_string(), data.to_vec());
        self.writes += 1;
        Ok(())
    }
}
