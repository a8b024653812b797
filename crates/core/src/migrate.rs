//! Collection-level upgrade of stored programs and runs.
//!
//! Applied on every load, not once: edits made after a run was written can
//! reintroduce length mismatches at any time. Elements that cannot be
//! repaired are kept as raw JSON so a later save writes them back as read.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::model::{
    ExerciseId, Program, ProgramId, ProgramItem, ProgramSection, RunId, RunInstance, RunSection,
    SectionId,
};
use crate::normalize::{
    finite_number, lenient_string, lenient_timestamp, normalize_exercise, resolve_reps, truthy,
};

//
// ─── PROGRAMS ──────────────────────────────────────────────────────────────────
//

/// One element of a migrated program collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MigratedProgram {
    Normalized(Program),
    Passthrough(Value),
}

impl MigratedProgram {
    #[must_use]
    pub fn as_program(&self) -> Option<&Program> {
        match self {
            Self::Normalized(program) => Some(program),
            Self::Passthrough(_) => None,
        }
    }

    pub fn as_program_mut(&mut self) -> Option<&mut Program> {
        match self {
            Self::Normalized(program) => Some(program),
            Self::Passthrough(_) => None,
        }
    }

    #[must_use]
    pub fn into_program(self) -> Option<Program> {
        match self {
            Self::Normalized(program) => Some(program),
            Self::Passthrough(_) => None,
        }
    }
}

impl From<Program> for MigratedProgram {
    fn from(program: Program) -> Self {
        Self::Normalized(program)
    }
}

/// Read every stored program, repairing ids, set counts and weights.
///
/// Anything other than a JSON array yields an empty collection.
#[must_use]
pub fn migrate_programs(raw: &Value) -> Vec<MigratedProgram> {
    raw.as_array()
        .map(|programs| programs.iter().map(migrate_program).collect())
        .unwrap_or_default()
}

/// Migrate a single stored program.
///
/// Non-objects and programs whose `sections` is neither absent nor an array
/// pass through untouched.
#[must_use]
pub fn migrate_program(raw: &Value) -> MigratedProgram {
    if !raw.is_object() {
        return MigratedProgram::Passthrough(raw.clone());
    }
    let sections = match raw.get("sections") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(sections)) => sections.iter().map(migrate_program_section).collect(),
        Some(_) => return MigratedProgram::Passthrough(raw.clone()),
    };
    MigratedProgram::Normalized(Program {
        id: ProgramId::new(lenient_string(raw.get("id"))),
        title: lenient_string(raw.get("title")),
        notes: raw.get("notes").and_then(Value::as_str).map(str::to_owned),
        sections,
    })
}

fn migrate_program_section(raw: &Value) -> ProgramSection {
    ProgramSection {
        id: SectionId::new(lenient_string(raw.get("id"))),
        title: lenient_string(raw.get("title")),
        items: raw
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(migrate_program_item).collect())
            .unwrap_or_default(),
    }
}

fn migrate_program_item(raw: &Value) -> ProgramItem {
    ProgramItem {
        id: ExerciseId::new(lenient_string(raw.get("id"))),
        title: lenient_string(raw.get("title")),
        reps: resolve_reps(raw.get("reps").and_then(finite_number), None),
        weight: raw.get("weight").and_then(finite_number).unwrap_or(0.0),
    }
}

/// Iterates the repaired programs of a migrated collection.
pub fn normalized_programs(programs: &[MigratedProgram]) -> impl Iterator<Item = &Program> {
    programs.iter().filter_map(MigratedProgram::as_program)
}

//
// ─── RUNS ──────────────────────────────────────────────────────────────────────
//

/// One element of a migrated run collection.
///
/// Elements without a `sections` array cannot be repaired and are carried
/// through untouched, so saving the collection back loses nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MigratedRun {
    Normalized(RunInstance),
    Passthrough(Value),
}

impl MigratedRun {
    #[must_use]
    pub fn as_run(&self) -> Option<&RunInstance> {
        match self {
            Self::Normalized(run) => Some(run),
            Self::Passthrough(_) => None,
        }
    }

    pub fn as_run_mut(&mut self) -> Option<&mut RunInstance> {
        match self {
            Self::Normalized(run) => Some(run),
            Self::Passthrough(_) => None,
        }
    }

    #[must_use]
    pub fn into_run(self) -> Option<RunInstance> {
        match self {
            Self::Normalized(run) => Some(run),
            Self::Passthrough(_) => None,
        }
    }
}

impl From<RunInstance> for MigratedRun {
    fn from(run: RunInstance) -> Self {
        Self::Normalized(run)
    }
}

/// Normalize every record of every section of every run.
///
/// Anything other than a JSON array yields an empty collection.
#[must_use]
pub fn migrate_runs(raw: &Value) -> Vec<MigratedRun> {
    raw.as_array()
        .map(|runs| runs.iter().map(migrate_run).collect())
        .unwrap_or_default()
}

/// Migrate a single stored run, keeping its identity and metadata.
#[must_use]
pub fn migrate_run(raw: &Value) -> MigratedRun {
    let Some(sections) = raw.get("sections").and_then(Value::as_array) else {
        return MigratedRun::Passthrough(raw.clone());
    };
    // A falsy `finishedAt` marks an active run; a truthy one must be readable.
    let finished_at = match raw.get("finishedAt").filter(|value| truthy(value)) {
        None => None,
        Some(value) => match lenient_timestamp(value) {
            Some(at) => Some(at),
            None => return MigratedRun::Passthrough(raw.clone()),
        },
    };
    let started_at = raw
        .get("startedAt")
        .and_then(lenient_timestamp)
        .or(finished_at)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    MigratedRun::Normalized(RunInstance {
        id: RunId::new(lenient_string(raw.get("id"))),
        program_id: ProgramId::new(lenient_string(raw.get("programId"))),
        started_at,
        finished_at,
        title: lenient_string(raw.get("title")),
        sections: sections.iter().map(migrate_section).collect(),
    })
}

fn migrate_section(raw: &Value) -> RunSection {
    RunSection {
        id: SectionId::new(lenient_string(raw.get("id"))),
        title: lenient_string(raw.get("title")),
        items: raw
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(normalize_exercise).collect())
            .unwrap_or_default(),
    }
}

/// Iterates the repaired runs of a migrated collection.
pub fn normalized_runs(runs: &[MigratedRun]) -> impl Iterator<Item = &RunInstance> {
    runs.iter().filter_map(MigratedRun::as_run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExerciseId;
    use serde_json::json;

    fn legacy_collection() -> Value {
        json!([
            {
                "id": "r1", "programId": "p1", "title": "Old",
                "startedAt": 1_700_000_000_000_i64, "finishedAt": 1_700_003_600_000_i64,
                "sections": [
                    { "id": "s1", "title": "Pecs", "items": [
                        { "id": "i1", "title": "DC", "reps": 3, "currentWeight": 42, "done": [true, false, false] }
                    ] }
                ]
            },
            { "id": "broken", "title": "no sections here" }
        ])
    }

    #[test]
    fn non_collections_yield_nothing() {
        assert!(migrate_runs(&json!(null)).is_empty());
        assert!(migrate_runs(&json!({ "sections": [] })).is_empty());
        assert!(migrate_runs(&json!("[]")).is_empty());
        assert!(migrate_runs(&json!([])).is_empty());
    }

    #[test]
    fn legacy_run_gets_per_set_weights() {
        let runs = migrate_runs(&legacy_collection());
        assert_eq!(runs.len(), 2);

        let run = runs[0].as_run().expect("first run is repairable");
        assert_eq!(run.id, RunId::new("r1"));
        assert_eq!(run.program_id, ProgramId::new("p1"));
        assert_eq!(run.started_at.timestamp(), 1_700_000_000);
        assert_eq!(run.finished_at.map(|t| t.timestamp()), Some(1_700_003_600));
        assert_eq!(run.sections[0].title, "Pecs");

        let record = &run.sections[0].items[0];
        assert_eq!(record.id, ExerciseId::new("i1"));
        assert_eq!(record.weights, vec![42.0, 42.0, 42.0]);
        assert_eq!(record.done, vec![true, false, false]);
    }

    #[test]
    fn runs_without_sections_pass_through_unchanged() {
        let raw = legacy_collection();
        let runs = migrate_runs(&raw);
        assert_eq!(runs[1], MigratedRun::Passthrough(raw[1].clone()));
        assert!(runs[1].as_run().is_none());
    }

    #[test]
    fn migration_is_idempotent() {
        let once = migrate_runs(&legacy_collection());
        let stored = serde_json::to_value(&once).unwrap();
        let twice = migrate_runs(&stored);
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_metadata_and_items_default_safely() {
        let run = migrate_run(&json!({
            "sections": [ { "title": "Legs", "items": "oops" }, 5 ]
        }))
        .into_run()
        .unwrap();
        assert_eq!(run.started_at, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(run.finished_at, None);
        assert!(run.id.is_blank());
        assert_eq!(run.sections.len(), 2);
        assert!(run.sections[0].items.is_empty());
        assert_eq!(run.sections[0].title, "Legs");
    }

    #[test]
    fn null_finished_at_means_active() {
        let run = migrate_run(&json!({
            "id": "r2", "startedAt": 1_700_000_000_000_i64, "finishedAt": null, "sections": []
        }))
        .into_run()
        .unwrap();
        assert!(!run.is_finished());
    }

    #[test]
    fn zero_or_empty_finished_at_means_active() {
        for finished in [json!(0), json!(""), json!(false)] {
            let run = migrate_run(&json!({
                "id": "r3", "startedAt": 1_700_000_000_000_i64, "finishedAt": finished, "sections": []
            }))
            .into_run()
            .unwrap();
            assert_eq!(run.finished_at, None);
        }
    }

    #[test]
    fn rfc3339_finished_at_keeps_the_run_finished() {
        let run = migrate_run(&json!({
            "id": "r4", "startedAt": 1_700_000_000_000_i64,
            "finishedAt": "2023-11-14T23:13:20Z", "sections": []
        }))
        .into_run()
        .unwrap();
        assert_eq!(run.finished_at.map(|t| t.timestamp()), Some(1_700_003_600));
    }

    #[test]
    fn unreadable_finished_at_passes_the_run_through() {
        let raw = json!({
            "id": "r5", "startedAt": 1_700_000_000_000_i64, "finishedAt": "sometime", "sections": []
        });
        assert_eq!(migrate_run(&raw), MigratedRun::Passthrough(raw.clone()));
    }

    #[test]
    fn programs_are_repaired_leniently() {
        let programs = migrate_programs(&json!([
            {"id": 7, "title": "Push", "sections": [
                {"id": "s1", "title": "Pecs", "items": [
                    {"id": "i1", "title": "DC", "reps": -1, "weight": 50},
                    {"id": "i2", "title": "Dips", "reps": 2.5, "weight": "heavy"}
                ]}
            ]},
            {"id": "p2", "title": "Pull"}
        ]));
        assert_eq!(programs.len(), 2);

        let push = programs[0].as_program().unwrap();
        assert_eq!(push.id, ProgramId::new("7"));
        let items = &push.sections[0].items;
        assert_eq!(items[0].reps, 1);
        assert!((items[0].weight - 50.0).abs() < f64::EPSILON);
        assert_eq!(items[1].reps, 3);
        assert!(items[1].weight.abs() < f64::EPSILON);

        let pull = programs[1].as_program().unwrap();
        assert!(pull.sections.is_empty());
    }

    #[test]
    fn unreadable_programs_pass_through_unchanged() {
        let raw = json!(["nonsense", {"id": "p3", "title": "Odd", "sections": "none"}]);
        let programs = migrate_programs(&raw);
        assert_eq!(programs[0], MigratedProgram::Passthrough(raw[0].clone()));
        assert_eq!(programs[1], MigratedProgram::Passthrough(raw[1].clone()));
        assert_eq!(normalized_programs(&programs).count(), 0);
    }

    #[test]
    fn program_migration_is_idempotent() {
        let once = migrate_programs(&json!([
            {"id": "p1", "title": "Legs", "notes": "deload", "sections": [
                {"id": "s1", "title": "Quads", "items": [{"id": "i1", "title": "Squat", "reps": 5, "weight": 100}]}
            ]}
        ]));
        let stored = serde_json::to_value(&once).unwrap();
        assert_eq!(migrate_programs(&stored), once);
    }
}
