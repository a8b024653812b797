#![forbid(unsafe_code)]

pub mod error;
pub mod workout_service;

pub use gym_core::Clock;

pub use error::WorkoutError;
pub use workout_service::WorkoutService;
