use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

use gym_core::{MigratedProgram, MigratedRun};

use crate::codec;
use crate::keys::StoreKeys;
use crate::legacy::{LegacyMigrationReport, migrate_legacy_keys};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Text key-value store the collections are persisted in.
///
/// Single writer, single process: the last `save` for a key wins.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the text stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the backend cannot be reached.
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the text stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the backend cannot be reached.
    async fn save(&self, key: &str, text: &str) -> Result<(), StorageError>;
}

/// In-memory store for tests and throwaway sessions.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the given entries.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            entries: Arc::new(Mutex::new(map)),
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn save(&self, key: &str, text: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        guard.insert(key.to_owned(), text.to_owned());
        Ok(())
    }
}

/// Programs and runs on top of a key-value store.
///
/// Loading is lenient: absent or corrupt text reads as an empty collection
/// and runs pass through the migrator. Only backend failures are errors.
#[derive(Clone)]
pub struct WorkoutRepository {
    store: Arc<dyn KeyValueStore>,
    keys: StoreKeys,
    legacy: Option<StoreKeys>,
}

impl WorkoutRepository {
    /// Repository on the current keys, upgrading from the legacy keys.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            keys: StoreKeys::current(),
            legacy: Some(StoreKeys::legacy()),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    #[must_use]
    pub fn with_keys(mut self, keys: StoreKeys, legacy: Option<StoreKeys>) -> Self {
        self.keys = keys;
        self.legacy = legacy;
        self
    }

    #[must_use]
    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Copy legacy text to the current keys where the current keys are empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read or written.
    pub async fn migrate_legacy(&self) -> Result<LegacyMigrationReport, StorageError> {
        match &self.legacy {
            Some(legacy) => migrate_legacy_keys(self.store.as_ref(), legacy, &self.keys).await,
            None => Ok(LegacyMigrationReport::default()),
        }
    }

    /// Load and migrate the program collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub async fn load_programs(&self) -> Result<Vec<MigratedProgram>, StorageError> {
        let text = self.store.load(&self.keys.programs).await?;
        let programs = text.as_deref().map(codec::decode_programs).unwrap_or_default();
        debug!(count = programs.len(), "loaded programs");
        Ok(programs)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the collection cannot be encoded or written.
    pub async fn save_programs(&self, programs: &[MigratedProgram]) -> Result<(), StorageError> {
        let text = codec::encode_programs(programs)?;
        self.store.save(&self.keys.programs, &text).await
    }

    /// Load and migrate the run collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    pub async fn load_runs(&self) -> Result<Vec<MigratedRun>, StorageError> {
        let text = self.store.load(&self.keys.runs).await?;
        let runs = text.as_deref().map(codec::decode_runs).unwrap_or_default();
        debug!(count = runs.len(), "loaded runs");
        Ok(runs)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the collection cannot be encoded or written.
    pub async fn save_runs(&self, runs: &[MigratedRun]) -> Result<(), StorageError> {
        let text = codec::encode_runs(runs)?;
        self.store.save(&self.keys.runs, &text).await
    }
}
