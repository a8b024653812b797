#![forbid(unsafe_code)]

pub mod analytics;
pub mod edit;
pub mod factory;
pub mod migrate;
pub mod model;
pub mod normalize;
pub mod progress;
pub mod time;

pub use analytics::{ExerciseSeries, ExerciseTrend, WeightPoint, WorkoutStats};
pub use edit::parse_weight_input;
pub use migrate::{
    MigratedProgram, MigratedRun, migrate_program, migrate_programs, migrate_run, migrate_runs,
};
pub use normalize::{MAX_REPS, normalize_exercise};
pub use progress::{SessionProgress, average_completed_weight};
pub use time::Clock;
