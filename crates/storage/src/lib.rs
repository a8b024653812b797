#![forbid(unsafe_code)]

pub mod codec;
pub mod keys;
pub mod legacy;
pub mod repository;
pub mod sqlite;

pub use keys::StoreKeys;
pub use legacy::{LegacyMigrationReport, migrate_legacy_keys};
pub use repository::{InMemoryStore, KeyValueStore, StorageError, WorkoutRepository};
