use chrono::Duration;
use gym_core::model::{Program, ProgramItem, ProgramSection};
use gym_core::time::fixed_now;
use services::{Clock, WorkoutService};
use storage::repository::WorkoutRepository;

fn upper_body() -> Program {
    Program::new(
        "Upper",
        vec![
            ProgramSection::new("Chest", vec![ProgramItem::new("Bench", 3, 60.0)]),
            ProgramSection::new("Back", vec![ProgramItem::new("Row", 3, 50.0)]),
        ],
    )
}

#[tokio::test]
async fn workout_flow_survives_reopen() {
    let url = "sqlite:file:memdb_workout_flow?mode=memory&cache=shared";
    let repo = WorkoutRepository::sqlite(url).await.expect("open sqlite");
    let mut clock = Clock::fixed(fixed_now());
    let mut service = WorkoutService::open(repo.clone(), clock).await;
    assert!(!service.is_degraded());

    let program_id = service.save_program(upper_body()).await.expect("save");
    let run = service.start_run(&program_id).await.expect("start");
    let chest = run.sections[0].id.clone();
    let bench = run.sections[0].items[0].id.clone();

    for set in 0..3 {
        service
            .toggle_set(&run.id, &chest, &bench, set)
            .await
            .expect("toggle");
    }
    service
        .set_reps(&run.id, &chest, &bench, 4)
        .await
        .expect("reps");
    service
        .set_notes(&run.id, &chest, &bench, Some("felt strong".into()))
        .await
        .expect("notes");

    clock.advance(Duration::minutes(50));
    service.set_clock(clock);
    service.finish_run(&run.id).await.expect("finish");

    let reopened = WorkoutService::open(repo, clock).await;
    let stored = reopened.run(&run.id).expect("stored run");
    let bench_record = &stored.sections[0].items[0];
    assert_eq!(bench_record.reps, 4);
    assert_eq!(bench_record.done, vec![true, true, true, false]);
    assert_eq!(bench_record.weights, vec![60.0; 4]);
    assert_eq!(bench_record.notes.as_deref(), Some("felt strong"));

    let progress = reopened.progress(&run.id).expect("progress");
    assert_eq!((progress.done_sets, progress.total_sets), (3, 7));

    let stats = reopened.stats();
    assert_eq!(stats.total_workouts, 1);
    assert_eq!(stats.this_week, 1);
    assert_eq!(stats.distinct_exercises, 2);
    assert_eq!(stats.total_minutes, 50);

    let history = reopened.weight_history();
    assert_eq!(history.len(), 1, "rows without completed sets leave no point");
    assert_eq!(history[0].title, "Bench");
}
