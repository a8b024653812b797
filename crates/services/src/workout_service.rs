use tracing::{debug, info, warn};

use gym_core::analytics::{
    self, DASHBOARD_LIMIT, DASHBOARD_MIN_SESSIONS, ExerciseSeries, WorkoutStats,
};
use gym_core::migrate::{normalized_programs, normalized_runs};
use gym_core::model::{ExerciseId, Program, ProgramId, RunId, RunInstance, SectionId};
use gym_core::{MigratedProgram, MigratedRun, SessionProgress, parse_weight_input};
use storage::repository::{StorageError, WorkoutRepository};

use crate::Clock;
use crate::error::WorkoutError;

/// Owns the program and run collections and writes them back after every
/// change.
///
/// If the store cannot be read the service starts empty in degraded mode and
/// stops writing, so whatever is stored survives. A failed write also
/// switches to degraded mode; in both cases the session keeps working in
/// memory.
pub struct WorkoutService {
    clock: Clock,
    repo: WorkoutRepository,
    programs: Vec<MigratedProgram>,
    runs: Vec<MigratedRun>,
    degraded: bool,
}

impl WorkoutService {
    /// Upgrade legacy keys and load both collections.
    pub async fn open(repo: WorkoutRepository, clock: Clock) -> Self {
        let mut service = Self {
            clock,
            repo,
            programs: Vec::new(),
            runs: Vec::new(),
            degraded: false,
        };
        if let Err(err) = service.load().await {
            warn!(error = %err, "store unavailable; continuing with empty collections");
            service.programs.clear();
            service.runs.clear();
            service.degraded = true;
        }
        service
    }

    async fn load(&mut self) -> Result<(), StorageError> {
        let report = self.repo.migrate_legacy().await?;
        if report.any() {
            info!(
                programs = report.programs_copied,
                runs = report.runs_copied,
                "upgraded legacy collections"
            );
        }
        self.programs = self.repo.load_programs().await?;
        self.runs = self.repo.load_runs().await?;
        let passthrough = self
            .programs
            .iter()
            .filter(|program| program.as_program().is_none())
            .count();
        if passthrough > 0 {
            warn!(count = passthrough, "keeping unreadable programs as stored");
        }
        let passthrough = self.runs.iter().filter(|run| run.as_run().is_none()).count();
        if passthrough > 0 {
            warn!(count = passthrough, "keeping unrepairable runs as stored");
        }
        debug!(
            programs = self.programs.len(),
            runs = self.runs.len(),
            "workout service ready"
        );
        Ok(())
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    //
    // ─── PROGRAMS ──────────────────────────────────────────────────────────────
    //

    /// Readable programs in stored order.
    #[must_use]
    pub fn programs(&self) -> Vec<&Program> {
        normalized_programs(&self.programs).collect()
    }

    #[must_use]
    pub fn program(&self, id: &ProgramId) -> Option<&Program> {
        normalized_programs(&self.programs).find(|program| &program.id == id)
    }

    /// Validate and insert or replace a program by id.
    ///
    /// Blank program, section and item ids are replaced with generated ones.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutError::Program` if the program fails validation.
    pub async fn save_program(&mut self, mut program: Program) -> Result<ProgramId, WorkoutError> {
        program.validate()?;
        program.fill_missing_ids();
        let id = program.id.clone();
        let slot = self
            .programs
            .iter_mut()
            .filter_map(MigratedProgram::as_program_mut)
            .find(|existing| existing.id == id);
        match slot {
            Some(existing) => *existing = program,
            None => self.programs.push(MigratedProgram::from(program)),
        }
        info!(program = %id, "saved program");
        self.persist_programs().await;
        Ok(id)
    }

    /// Remove a program. Runs started from it are kept.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutError::ProgramNotFound` if no program has this id.
    pub async fn delete_program(&mut self, id: &ProgramId) -> Result<(), WorkoutError> {
        let before = self.programs.len();
        self.programs
            .retain(|program| program.as_program().is_none_or(|program| &program.id != id));
        if self.programs.len() == before {
            return Err(WorkoutError::ProgramNotFound(id.clone()));
        }
        info!(program = %id, "deleted program");
        self.persist_programs().await;
        Ok(())
    }

    //
    // ─── RUNS ──────────────────────────────────────────────────────────────────
    //

    /// Start a session from a snapshot of the program.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutError::ProgramNotFound` if no program has this id.
    pub async fn start_run(&mut self, program_id: &ProgramId) -> Result<RunInstance, WorkoutError> {
        let program = self
            .program(program_id)
            .ok_or_else(|| WorkoutError::ProgramNotFound(program_id.clone()))?;
        let run = RunInstance::from_program(program, self.clock.now());
        info!(run = %run.id, program = %program_id, "started run");
        self.runs.push(MigratedRun::from(run.clone()));
        self.persist_runs().await;
        Ok(run)
    }

    #[must_use]
    pub fn run(&self, id: &RunId) -> Option<&RunInstance> {
        normalized_runs(&self.runs).find(|run| &run.id == id)
    }

    /// Repaired runs in stored order.
    pub fn runs(&self) -> impl Iterator<Item = &RunInstance> {
        normalized_runs(&self.runs)
    }

    #[must_use]
    pub fn active_runs(&self) -> Vec<RunInstance> {
        analytics::active_runs(&self.snapshot())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Finished runs, most recently finished first.
    #[must_use]
    pub fn finished_runs(&self) -> Vec<RunInstance> {
        analytics::finished_runs(&self.snapshot())
            .into_iter()
            .cloned()
            .collect()
    }

    /// # Errors
    ///
    /// Returns `WorkoutError::RunNotFound` if no run has this id.
    pub async fn toggle_set(
        &mut self,
        run_id: &RunId,
        section: &SectionId,
        exercise: &ExerciseId,
        index: usize,
    ) -> Result<RunInstance, WorkoutError> {
        self.edit_run(run_id, |run| run.toggle_set(section, exercise, index))
            .await
    }

    /// # Errors
    ///
    /// Returns `WorkoutError::RunNotFound` if no run has this id.
    pub async fn set_weight(
        &mut self,
        run_id: &RunId,
        section: &SectionId,
        exercise: &ExerciseId,
        index: usize,
        value: f64,
    ) -> Result<RunInstance, WorkoutError> {
        self.edit_run(run_id, |run| run.set_weight(section, exercise, index, value))
            .await
    }

    /// Like [`Self::set_weight`] for raw text input; unparsable text stores 0.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutError::RunNotFound` if no run has this id.
    pub async fn set_weight_input(
        &mut self,
        run_id: &RunId,
        section: &SectionId,
        exercise: &ExerciseId,
        index: usize,
        raw: &str,
    ) -> Result<RunInstance, WorkoutError> {
        let value = parse_weight_input(raw);
        self.set_weight(run_id, section, exercise, index, value)
            .await
    }

    /// # Errors
    ///
    /// Returns `WorkoutError::RunNotFound` if no run has this id.
    pub async fn set_reps(
        &mut self,
        run_id: &RunId,
        section: &SectionId,
        exercise: &ExerciseId,
        reps: u32,
    ) -> Result<RunInstance, WorkoutError> {
        self.edit_run(run_id, |run| run.set_reps(section, exercise, reps))
            .await
    }

    /// # Errors
    ///
    /// Returns `WorkoutError::RunNotFound` if no run has this id.
    pub async fn set_notes(
        &mut self,
        run_id: &RunId,
        section: &SectionId,
        exercise: &ExerciseId,
        notes: Option<String>,
    ) -> Result<RunInstance, WorkoutError> {
        self.edit_run(run_id, |run| run.set_notes(section, exercise, notes))
            .await
    }

    /// Stamp the finish time. A run that is already finished keeps its time.
    ///
    /// # Errors
    ///
    /// Returns `WorkoutError::RunNotFound` if no run has this id.
    pub async fn finish_run(&mut self, run_id: &RunId) -> Result<RunInstance, WorkoutError> {
        let now = self.clock.now();
        let run = self.edit_run(run_id, |run| run.finish(now)).await?;
        info!(run = %run_id, "finished run");
        Ok(run)
    }

    /// # Errors
    ///
    /// Returns `WorkoutError::RunNotFound` if no run has this id.
    pub async fn delete_run(&mut self, run_id: &RunId) -> Result<(), WorkoutError> {
        let before = self.runs.len();
        self.runs
            .retain(|run| run.as_run().is_none_or(|run| &run.id != run_id));
        if self.runs.len() == before {
            return Err(WorkoutError::RunNotFound(run_id.clone()));
        }
        info!(run = %run_id, "deleted run");
        self.persist_runs().await;
        Ok(())
    }

    //
    // ─── ANALYTICS ─────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `WorkoutError::RunNotFound` if no run has this id.
    pub fn progress(&self, run_id: &RunId) -> Result<SessionProgress, WorkoutError> {
        self.run(run_id)
            .map(SessionProgress::of)
            .ok_or_else(|| WorkoutError::RunNotFound(run_id.clone()))
    }

    #[must_use]
    pub fn stats(&self) -> WorkoutStats {
        WorkoutStats::compute(&self.snapshot(), self.clock.now())
    }

    #[must_use]
    pub fn weight_history(&self) -> Vec<ExerciseSeries> {
        analytics::weight_history(&self.snapshot())
    }

    /// Exercise series shown on the dashboard.
    #[must_use]
    pub fn top_exercises(&self) -> Vec<ExerciseSeries> {
        let history = self.weight_history();
        analytics::top_exercises(&history, DASHBOARD_MIN_SESSIONS, DASHBOARD_LIMIT)
            .into_iter()
            .cloned()
            .collect()
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn snapshot(&self) -> Vec<RunInstance> {
        normalized_runs(&self.runs).cloned().collect()
    }

    async fn edit_run(
        &mut self,
        run_id: &RunId,
        edit: impl FnOnce(RunInstance) -> RunInstance,
    ) -> Result<RunInstance, WorkoutError> {
        let slot = self
            .runs
            .iter_mut()
            .filter_map(MigratedRun::as_run_mut)
            .find(|run| &run.id == run_id)
            .ok_or_else(|| WorkoutError::RunNotFound(run_id.clone()))?;
        *slot = edit(std::mem::take(slot));
        let updated = slot.clone();
        debug!(run = %run_id, "updated run");
        self.persist_runs().await;
        Ok(updated)
    }

    async fn persist_programs(&mut self) {
        if self.degraded {
            return;
        }
        if let Err(err) = self.repo.save_programs(&self.programs).await {
            self.enter_degraded("programs", &err);
        }
    }

    async fn persist_runs(&mut self) {
        if self.degraded {
            return;
        }
        if let Err(err) = self.repo.save_runs(&self.runs).await {
            self.enter_degraded("runs", &err);
        }
    }

    fn enter_degraded(&mut self, collection: &'static str, err: &StorageError) {
        warn!(collection, error = %err, "save failed; keeping changes in memory only");
        self.degraded = true;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::Duration;
    use gym_core::model::{ProgramItem, ProgramSection};
    use gym_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryStore, KeyValueStore};
    use storage::StoreKeys;

    use super::*;

    /// Store whose reads and writes can be switched off.
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: InMemoryStore,
        fail_loads: Arc<AtomicBool>,
        fail_saves: Arc<AtomicBool>,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("disk on fire".into()));
            }
            self.inner.load(key).await
        }

        async fn save(&self, key: &str, text: &str) -> Result<(), StorageError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("disk full".into()));
            }
            self.inner.save(key, text).await
        }
    }

    fn legs() -> Program {
        Program::new(
            "Legs",
            vec![ProgramSection::new(
                "Quads",
                vec![
                    ProgramItem::new("Squat", 3, 100.0),
                    ProgramItem::new("Lunge", 2, 20.0),
                ],
            )],
        )
    }

    async fn service_with(store: &FlakyStore) -> WorkoutService {
        let repo = WorkoutRepository::new(Arc::new(store.clone()));
        WorkoutService::open(repo, fixed_clock()).await
    }

    fn squat_ids(run: &RunInstance) -> (SectionId, ExerciseId) {
        (
            run.sections[0].id.clone(),
            run.sections[0].items[0].id.clone(),
        )
    }

    #[tokio::test]
    async fn save_program_generates_missing_ids_and_upserts() {
        let mut service = service_with(&FlakyStore::default()).await;
        let mut program = legs();
        program.id = ProgramId::new("");
        let id = service.save_program(program).await.unwrap();
        assert!(!id.is_blank());

        let mut renamed = service.program(&id).unwrap().clone();
        renamed.title = "Leg day".into();
        service.save_program(renamed).await.unwrap();
        assert_eq!(service.programs().len(), 1);
        assert_eq!(service.programs()[0].title, "Leg day");
    }

    #[tokio::test]
    async fn invalid_programs_are_rejected() {
        let mut service = service_with(&FlakyStore::default()).await;
        let err = service
            .save_program(Program::new("  ", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkoutError::Program(_)));
        assert!(service.programs().is_empty());
    }

    #[tokio::test]
    async fn run_lifecycle_persists_every_step() {
        let store = FlakyStore::default();
        let mut service = service_with(&store).await;
        let program_id = service.save_program(legs()).await.unwrap();
        let run = service.start_run(&program_id).await.unwrap();
        let (section, squat) = squat_ids(&run);

        service
            .toggle_set(&run.id, &section, &squat, 0)
            .await
            .unwrap();
        service
            .set_weight_input(&run.id, &section, &squat, 1, "102,5")
            .await
            .unwrap();
        assert_eq!(service.progress(&run.id).unwrap().done_sets, 1);

        let mut clock = service.clock();
        clock.advance(Duration::minutes(45));
        service.set_clock(clock);
        let finished = service.finish_run(&run.id).await.unwrap();
        assert_eq!(finished.finished_at, Some(fixed_now() + Duration::minutes(45)));

        let reopened = service_with(&store).await;
        let stored = reopened.run(&run.id).unwrap();
        assert_eq!(stored, &finished);
        assert_eq!(stored.sections[0].items[0].weights, vec![100.0, 102.5, 100.0]);
        assert_eq!(reopened.stats().total_minutes, 45);
    }

    #[tokio::test]
    async fn finishing_twice_keeps_the_first_time() {
        let mut service = service_with(&FlakyStore::default()).await;
        let program_id = service.save_program(legs()).await.unwrap();
        let run = service.start_run(&program_id).await.unwrap();
        let first = service.finish_run(&run.id).await.unwrap();

        let mut clock = service.clock();
        clock.advance(Duration::hours(2));
        service.set_clock(clock);
        let second = service.finish_run(&run.id).await.unwrap();
        assert_eq!(first.finished_at, second.finished_at);
    }

    #[tokio::test]
    async fn runs_survive_program_deletion() {
        let mut service = service_with(&FlakyStore::default()).await;
        let program_id = service.save_program(legs()).await.unwrap();
        let run = service.start_run(&program_id).await.unwrap();
        service.delete_program(&program_id).await.unwrap();

        assert!(service.programs().is_empty());
        assert_eq!(service.run(&run.id).unwrap().title, "Legs");
        assert_eq!(
            service.delete_program(&program_id).await,
            Err(WorkoutError::ProgramNotFound(program_id))
        );
    }

    #[tokio::test]
    async fn unknown_ids_are_reported() {
        let mut service = service_with(&FlakyStore::default()).await;
        let missing = RunId::new("missing");
        assert!(matches!(
            service.start_run(&ProgramId::new("nope")).await,
            Err(WorkoutError::ProgramNotFound(_))
        ));
        assert!(matches!(
            service.finish_run(&missing).await,
            Err(WorkoutError::RunNotFound(_))
        ));
        assert!(matches!(
            service.delete_run(&missing).await,
            Err(WorkoutError::RunNotFound(_))
        ));
        assert!(service.progress(&missing).is_err());
    }

    #[tokio::test]
    async fn active_and_finished_runs_are_split() {
        let mut service = service_with(&FlakyStore::default()).await;
        let program_id = service.save_program(legs()).await.unwrap();
        let done = service.start_run(&program_id).await.unwrap();
        let open = service.start_run(&program_id).await.unwrap();
        service.finish_run(&done.id).await.unwrap();

        let active: Vec<RunId> = service.active_runs().into_iter().map(|r| r.id).collect();
        let finished: Vec<RunId> = service.finished_runs().into_iter().map(|r| r.id).collect();
        assert_eq!(active, vec![open.id.clone()]);
        assert_eq!(finished, vec![done.id.clone()]);

        service.delete_run(&open.id).await.unwrap();
        assert_eq!(service.runs().count(), 1);
    }

    #[tokio::test]
    async fn unreadable_store_starts_degraded_and_never_writes() {
        let store = FlakyStore::default();
        let keys = StoreKeys::current();
        store.inner.save(&keys.programs, "[]").await.unwrap();
        store.fail_loads.store(true, Ordering::SeqCst);

        let mut service = service_with(&store).await;
        assert!(service.is_degraded());
        assert!(service.programs().is_empty());

        service.save_program(legs()).await.unwrap();
        assert_eq!(service.programs().len(), 1, "edits still apply in memory");
        assert_eq!(
            store.inner.load(&keys.programs).await.unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn failed_save_switches_to_degraded_mode() {
        let store = FlakyStore::default();
        let mut service = service_with(&store).await;
        assert!(!service.is_degraded());

        store.fail_saves.store(true, Ordering::SeqCst);
        let id = service.save_program(legs()).await.unwrap();
        assert!(service.is_degraded());
        assert!(service.program(&id).is_some());
    }

    #[tokio::test]
    async fn unrepairable_runs_are_written_back_untouched() {
        let keys = StoreKeys::current();
        let raw = r#"[{"id":"odd","note":"no sections"}]"#;
        let store = FlakyStore {
            inner: InMemoryStore::with_entries([(keys.runs.clone(), raw.to_string())]),
            ..FlakyStore::default()
        };
        let mut service = service_with(&store).await;
        assert_eq!(service.runs().count(), 0);

        let program_id = service.save_program(legs()).await.unwrap();
        service.start_run(&program_id).await.unwrap();

        let stored = store.inner.load(&keys.runs).await.unwrap().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored[0], serde_json::json!({"id": "odd", "note": "no sections"}));
        assert_eq!(stored.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn loosely_typed_programs_survive_a_save() {
        let keys = StoreKeys::current();
        let raw = serde_json::json!([
            {"id": "p1", "title": "Push", "sections": [
                {"id": "s1", "title": "Pecs", "items": [
                    {"id": "i1", "title": "Bench", "reps": -1, "weight": 60}
                ]}
            ]},
            {"id": "p2", "title": "Pull", "sections": []}
        ]);
        let store = FlakyStore {
            inner: InMemoryStore::with_entries([(keys.programs.clone(), raw.to_string())]),
            ..FlakyStore::default()
        };
        let mut service = service_with(&store).await;
        let bench = &service.program(&ProgramId::new("p1")).unwrap().sections[0].items[0];
        assert_eq!(bench.reps, 1);

        service.save_program(legs()).await.unwrap();

        let stored = store.inner.load(&keys.programs).await.unwrap().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
        let ids: Vec<&str> = stored
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|program| program["id"].as_str())
            .collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(&ids[..2], &["p1", "p2"]);
        assert_eq!(stored[0]["sections"][0]["items"][0]["reps"], 1);
    }

    #[tokio::test]
    async fn unreadable_programs_are_written_back_untouched() {
        let keys = StoreKeys::current();
        let raw = r#"["not a program",{"id":"odd","sections":"none"}]"#;
        let store = FlakyStore {
            inner: InMemoryStore::with_entries([(keys.programs.clone(), raw.to_string())]),
            ..FlakyStore::default()
        };
        let mut service = service_with(&store).await;
        assert!(service.programs().is_empty());

        let id = service.save_program(legs()).await.unwrap();
        service.delete_program(&id).await.unwrap();

        let stored = store.inner.load(&keys.programs).await.unwrap().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&stored).unwrap();
        let original: serde_json::Value = serde_json::from_str(raw).unwrap();
        assert_eq!(stored, original);
    }

    #[tokio::test]
    async fn dashboard_lists_exercises_with_repeat_sessions() {
        let mut service = service_with(&FlakyStore::default()).await;
        let program_id = service.save_program(legs()).await.unwrap();
        for day in 0..2 {
            let run = service.start_run(&program_id).await.unwrap();
            let (section, squat) = squat_ids(&run);
            service
                .set_weight(&run.id, &section, &squat, 0, 100.0 + f64::from(day) * 5.0)
                .await
                .unwrap();
            service
                .toggle_set(&run.id, &section, &squat, 0)
                .await
                .unwrap();
            service.finish_run(&run.id).await.unwrap();
            let mut clock = service.clock();
            clock.advance(Duration::days(1));
            service.set_clock(clock);
        }

        let top = service.top_exercises();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].title, "Squat");
        assert!((top[0].trend().unwrap().change - 5.0).abs() < 1e-9);
        assert_eq!(service.stats().total_workouts, 2);
    }
}
