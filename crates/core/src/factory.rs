use chrono::{DateTime, Utc};

use crate::model::{
    ExerciseId, ExerciseRecord, Program, ProgramItem, ProgramSection, RunId, RunInstance,
    RunSection, SectionId,
};

impl RunInstance {
    /// Snapshot a program into a new, active session.
    ///
    /// The run gets fresh ids for itself, its sections and its records, and
    /// keeps only the program id as a lookup reference. Every set starts
    /// undone at the item's default weight.
    #[must_use]
    pub fn from_program(program: &Program, now: DateTime<Utc>) -> Self {
        Self {
            id: RunId::generate(),
            program_id: program.id.clone(),
            started_at: now,
            finished_at: None,
            title: program.title.clone(),
            sections: program.sections.iter().map(snapshot_section).collect(),
        }
    }
}

fn snapshot_section(section: &ProgramSection) -> RunSection {
    RunSection {
        id: SectionId::generate(),
        title: section.title.clone(),
        items: section.items.iter().map(snapshot_item).collect(),
    }
}

fn snapshot_item(item: &ProgramItem) -> ExerciseRecord {
    let sets = item.reps as usize;
    ExerciseRecord {
        id: ExerciseId::generate(),
        title: item.title.clone(),
        reps: item.reps,
        weights: vec![item.weight; sets],
        done: vec![false; sets],
        notes: None,
        current_weight: Some(item.weight),
    }
    .normalized()
}
