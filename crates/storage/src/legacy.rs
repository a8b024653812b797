use tracing::info;

use crate::keys::StoreKeys;
use crate::repository::{KeyValueStore, StorageError};

/// Which collections were copied from the legacy keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyMigrationReport {
    pub programs_copied: bool,
    pub runs_copied: bool,
}

impl LegacyMigrationReport {
    #[must_use]
    pub fn any(&self) -> bool {
        self.programs_copied || self.runs_copied
    }
}

/// Copy each legacy collection verbatim to its current key.
///
/// A key is copied only when the legacy text is non-empty and the current key
/// is absent or empty, so running this twice changes nothing. The text is not
/// reshaped here; run records are upgraded when they are loaded.
///
/// # Errors
///
/// Returns `StorageError` if the store cannot be read or written.
pub async fn migrate_legacy_keys(
    store: &dyn KeyValueStore,
    legacy: &StoreKeys,
    current: &StoreKeys,
) -> Result<LegacyMigrationReport, StorageError> {
    let mut report = LegacyMigrationReport::default();
    for ((label, old_key), (_, new_key)) in legacy.entries().into_iter().zip(current.entries()) {
        if old_key == new_key {
            continue;
        }
        let existing = store.load(new_key).await?;
        if existing.is_some_and(|text| !text.is_empty()) {
            continue;
        }
        let Some(text) = store.load(old_key).await?.filter(|text| !text.is_empty()) else {
            continue;
        };
        store.save(new_key, &text).await?;
        info!(collection = label, from = old_key, to = new_key, "copied legacy collection");
        match label {
            "programs" => report.programs_copied = true,
            _ => report.runs_copied = true,
        }
    }
    Ok(report)
}
