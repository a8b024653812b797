//! Shared error types for the services crate.

use thiserror::Error;

use gym_core::model::{ProgramError, ProgramId, RunId};

/// Errors emitted by `WorkoutService`.
///
/// Storage failures are not among them: the service falls back to degraded
/// mode instead.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum WorkoutError {
    #[error("program `{0}` not found")]
    ProgramNotFound(ProgramId),
    #[error("run `{0}` not found")]
    RunNotFound(RunId),
    #[error(transparent)]
    Program(#[from] ProgramError),
}
