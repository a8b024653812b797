//! Edit intents coming from the presentation layer.
//!
//! Each intent consumes a run and returns the updated one. The targeted record
//! is normalized before the edit is applied. Unknown ids and out-of-range set
//! indices leave the run unchanged.

use chrono::{DateTime, Utc};

use crate::model::{ExerciseId, ExerciseRecord, RunInstance, SectionId};

impl RunInstance {
    #[must_use]
    pub fn toggle_set(self, section: &SectionId, exercise: &ExerciseId, index: usize) -> Self {
        self.patch_exercise(section, exercise, |mut record| {
            if let Some(done) = record.done.get_mut(index) {
                *done = !*done;
            }
            record
        })
    }

    /// Set the weight of one set. Non-finite input is stored as `0`.
    #[must_use]
    pub fn set_weight(
        self,
        section: &SectionId,
        exercise: &ExerciseId,
        index: usize,
        value: f64,
    ) -> Self {
        let value = if value.is_finite() { value } else { 0.0 };
        self.patch_exercise(section, exercise, |mut record| {
            if let Some(weight) = record.weights.get_mut(index) {
                *weight = value;
            }
            record
        })
    }

    /// Change the set count; existing sets keep their values, extra sets are
    /// dropped and new ones start undone. Zero is ignored.
    #[must_use]
    pub fn set_reps(self, section: &SectionId, exercise: &ExerciseId, reps: u32) -> Self {
        if reps == 0 {
            return self;
        }
        self.patch_exercise(section, exercise, |record| {
            ExerciseRecord { reps, ..record }.normalized()
        })
    }

    #[must_use]
    pub fn set_notes(
        self,
        section: &SectionId,
        exercise: &ExerciseId,
        notes: Option<String>,
    ) -> Self {
        let notes = notes.filter(|text| !text.trim().is_empty());
        self.patch_exercise(section, exercise, |record| ExerciseRecord { notes, ..record })
    }

    /// Mark the run finished. A run that already has `finished_at` keeps it.
    #[must_use]
    pub fn finish(mut self, now: DateTime<Utc>) -> Self {
        if self.finished_at.is_none() {
            self.finished_at = Some(now);
        }
        self
    }

    fn patch_exercise(
        mut self,
        section: &SectionId,
        exercise: &ExerciseId,
        patch: impl FnOnce(ExerciseRecord) -> ExerciseRecord,
    ) -> Self {
        let target = self
            .sections
            .iter_mut()
            .filter(|s| &s.id == section)
            .flat_map(|s| s.items.iter_mut())
            .find(|record| &record.id == exercise);

        if let Some(record) = target {
            let fixed = std::mem::take(record).normalized();
            *record = patch(fixed);
        }
        self
    }
}

/// Coerce text from a weight field into a number.
///
/// Blank or unparsable input becomes `0`; a decimal comma is accepted.
#[must_use]
pub fn parse_weight_input(raw: &str) -> f64 {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
