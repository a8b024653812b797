use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{ExerciseId, ProgramId, RunId, SectionId};

/// One executed session of a program.
///
/// A run owns its sections and records outright. `finished_at` absent means
/// the session is still active; once set it is never cleared or moved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInstance {
    pub id: RunId,
    #[serde(default)]
    pub program_id: ProgramId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub finished_at: Option<DateTime<Utc>>,
    pub title: String,
    pub sections: Vec<RunSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    pub id: SectionId,
    pub title: String,
    #[serde(default)]
    pub items: Vec<ExerciseRecord>,
}

/// Per-set state for one exercise inside a run.
///
/// `reps` is the authoritative set count: after normalization
/// `weights.len() == done.len() == reps`. Data at rest may violate this, so
/// every read path goes through the normalizer first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRecord {
    pub id: ExerciseId,
    pub title: String,
    pub reps: u32,
    pub weights: Vec<f64>,
    pub done: Vec<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Scalar weight written by the first schema, before per-set weights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_weight: Option<f64>,
}

impl RunInstance {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Wall time between start and finish, `None` while the run is active.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.finished_at.map(|finished| finished - self.started_at)
    }

    /// Iterates every exercise record across all sections, in order.
    pub fn records(&self) -> impl Iterator<Item = &ExerciseRecord> {
        self.sections.iter().flat_map(|section| section.items.iter())
    }

    /// Re-establish the per-set invariant on every record.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for section in &mut self.sections {
            let items = std::mem::take(&mut section.items);
            section.items = items.into_iter().map(ExerciseRecord::normalized).collect();
        }
        self
    }
}

impl ExerciseRecord {
    /// Number of sets ticked as done.
    #[must_use]
    pub fn completed_sets(&self) -> u32 {
        let count = self.done.iter().filter(|done| **done).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// True when the per-set arrays match `reps`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let reps = self.reps as usize;
        self.reps > 0 && self.weights.len() == reps && self.done.len() == reps
    }
}
