//! Text encoding of the stored collections.
//!
//! Decoding never fails: corrupt text is logged and read as an empty
//! collection, matching how the stores treat an absent key.

use serde_json::Value;
use tracing::warn;

use gym_core::{MigratedProgram, MigratedRun, migrate_programs, migrate_runs};

use crate::repository::StorageError;

fn parse(text: &str, collection: &'static str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(collection, error = %err, "stored collection is not valid JSON; reading it as empty");
            None
        }
    }
}

/// Decode and migrate the program collection.
#[must_use]
pub fn decode_programs(text: &str) -> Vec<MigratedProgram> {
    let Some(value) = parse(text, "programs") else {
        return Vec::new();
    };
    if !value.is_array() {
        warn!("stored programs are not an array; reading them as empty");
    }
    migrate_programs(&value)
}

/// Decode and migrate the run collection.
#[must_use]
pub fn decode_runs(text: &str) -> Vec<MigratedRun> {
    let Some(value) = parse(text, "runs") else {
        return Vec::new();
    };
    if !value.is_array() {
        warn!("stored runs are not an array; reading them as empty");
    }
    migrate_runs(&value)
}

/// Encode programs, writing unreadable elements back exactly as they were read.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the collection cannot be encoded.
pub fn encode_programs(programs: &[MigratedProgram]) -> Result<String, StorageError> {
    serde_json::to_string(programs).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Encode runs, writing unrepairable elements back exactly as they were read.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the collection cannot be encoded.
pub fn encode_runs(runs: &[MigratedRun]) -> Result<String, StorageError> {
    serde_json::to_string(runs).map_err(|e| StorageError::Serialization(e.to_string()))
}
