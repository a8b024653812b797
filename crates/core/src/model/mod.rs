mod ids;
mod program;
mod run;

pub use ids::{ExerciseId, ProgramId, RunId, SectionId};

pub use program::{Program, ProgramError, ProgramItem, ProgramSection};
pub use run::{ExerciseRecord, RunInstance, RunSection};
