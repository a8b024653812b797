use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ExerciseId, ProgramId, SectionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgramError {
    #[error("program title cannot be empty")]
    EmptyTitle,

    #[error("exercise `{item}` must have at least one set")]
    InvalidReps { item: String },

    #[error("exercise `{item}` has a non-numeric default weight")]
    InvalidWeight { item: String },
}

//
// ─── TEMPLATE TYPES ────────────────────────────────────────────────────────────
//

/// Reusable workout blueprint.
///
/// Sessions snapshot a program when they start; later edits to the template
/// never reach existing sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    #[serde(default)]
    pub id: ProgramId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub sections: Vec<ProgramSection>,
}

/// Body-part or category grouping inside a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSection {
    #[serde(default)]
    pub id: SectionId,
    pub title: String,
    #[serde(default)]
    pub items: Vec<ProgramItem>,
}

/// Template exercise: a target number of sets and one default weight.
///
/// The weight is unit-agnostic; "kg" is a presentation label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramItem {
    #[serde(default)]
    pub id: ExerciseId,
    pub title: String,
    pub reps: u32,
    pub weight: f64,
}

impl Program {
    /// Creates a program with a freshly generated id.
    #[must_use]
    pub fn new(title: impl Into<String>, sections: Vec<ProgramSection>) -> Self {
        Self {
            id: ProgramId::generate(),
            title: title.into(),
            notes: None,
            sections,
        }
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Check the program before it is saved by the builder.
    ///
    /// # Errors
    ///
    /// Returns `ProgramError::EmptyTitle` for a blank title, and
    /// `InvalidReps` / `InvalidWeight` for the first offending item.
    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.title.trim().is_empty() {
            return Err(ProgramError::EmptyTitle);
        }
        for item in self.items() {
            if item.reps == 0 {
                return Err(ProgramError::InvalidReps {
                    item: item.title.clone(),
                });
            }
            if !item.weight.is_finite() {
                return Err(ProgramError::InvalidWeight {
                    item: item.title.clone(),
                });
            }
        }
        Ok(())
    }

    /// Give the program, its sections and its items fresh ids where blank.
    pub fn fill_missing_ids(&mut self) {
        if self.id.is_blank() {
            self.id = ProgramId::generate();
        }
        for section in &mut self.sections {
            if section.id.is_blank() {
                section.id = SectionId::generate();
            }
            for item in &mut section.items {
                if item.id.is_blank() {
                    item.id = ExerciseId::generate();
                }
            }
        }
    }

    /// Iterates every item across all sections, in order.
    pub fn items(&self) -> impl Iterator<Item = &ProgramItem> {
        self.sections.iter().flat_map(|section| section.items.iter())
    }

    /// Total number of sets a session of this program will contain.
    #[must_use]
    pub fn total_sets(&self) -> u32 {
        self.items()
            .fold(0_u32, |acc, item| acc.saturating_add(item.reps))
    }
}

impl ProgramSection {
    #[must_use]
    pub fn new(title: impl Into<String>, items: Vec<ProgramItem>) -> Self {
        Self {
            id: SectionId::generate(),
            title: title.into(),
            items,
        }
    }
}

impl ProgramItem {
    #[must_use]
    pub fn new(title: impl Into<String>, reps: u32, weight: f64) -> Self {
        Self {
            id: ExerciseId::generate(),
            title: title.into(),
            reps,
            weight,
        }
    }
}
