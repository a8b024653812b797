//! Aggregates over a migrated run history.
//!
//! Everything here is a pure function of the history and "now": nothing is
//! cached between calls. Unless stated otherwise only finished runs count.

mod history;
mod streak;

pub use history::{
    DASHBOARD_LIMIT, DASHBOARD_MIN_SESSIONS, ExerciseSeries, ExerciseTrend, WeightPoint,
    top_exercises, weight_history,
};
pub use streak::{STREAK_CAP_DAYS, streak, streak_in};

use std::collections::HashSet;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;

use crate::model::RunInstance;
use crate::time::{rounded_minutes, within_trailing_days};

/// Length of the trailing "this week" window.
pub const WEEK_WINDOW_DAYS: i64 = 7;

/// Summary numbers for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WorkoutStats {
    pub total_workouts: u32,
    /// Finished within the trailing seven days.
    pub this_week: u32,
    /// Distinct exercise titles over every run, finished or not.
    pub distinct_exercises: u32,
    /// Mean of per-record mean weights, rounded to 0.1; `0.0` without data.
    pub average_weight: f64,
    /// Consecutive days with a finished run, ending today.
    pub streak: u32,
    /// Time spent in finished runs, rounded to whole minutes.
    pub total_minutes: i64,
}

impl WorkoutStats {
    /// Stats with calendar days taken in the local timezone.
    #[must_use]
    pub fn compute(runs: &[RunInstance], now: DateTime<Utc>) -> Self {
        Self::compute_in(runs, now, &Local)
    }

    #[must_use]
    pub fn compute_in<Tz: TimeZone>(runs: &[RunInstance], now: DateTime<Utc>, tz: &Tz) -> Self {
        let this_week = finished(runs)
            .filter(|run| {
                run.finished_at
                    .is_some_and(|at| within_trailing_days(at, now, WEEK_WINDOW_DAYS))
            })
            .count();

        Self {
            total_workouts: saturating_u32(finished(runs).count()),
            this_week: saturating_u32(this_week),
            distinct_exercises: distinct_exercises(runs),
            average_weight: round_to_tenth(average_weight(runs).unwrap_or(0.0)),
            streak: streak_in(runs, now, tz),
            total_minutes: total_minutes(runs),
        }
    }
}

pub(crate) fn finished(runs: &[RunInstance]) -> impl Iterator<Item = &RunInstance> {
    runs.iter().filter(|run| run.is_finished())
}

fn distinct_exercises(runs: &[RunInstance]) -> u32 {
    let titles: HashSet<&str> = runs
        .iter()
        .flat_map(|run| run.records())
        .map(|record| record.title.as_str())
        .collect();
    saturating_u32(titles.len())
}

/// Unweighted mean of each record's own mean weight, done or not.
///
/// Deliberately differs from the completed-sets average used by the history
/// series. Records without a finite weight do not take part.
#[must_use]
pub fn average_weight(runs: &[RunInstance]) -> Option<f64> {
    let (sum, count) = finished(runs)
        .flat_map(|run| run.records())
        .filter_map(|record| mean(record.weights.iter().copied().filter(|w| w.is_finite())))
        .fold((0.0, 0_u32), |(sum, count), record_mean| {
            (sum + record_mean, count + 1)
        });
    (count > 0).then(|| sum / f64::from(count))
}

fn total_minutes(runs: &[RunInstance]) -> i64 {
    rounded_minutes(finished(runs).filter_map(RunInstance::duration))
}

/// Runs still in progress, in stored order.
#[must_use]
pub fn active_runs(runs: &[RunInstance]) -> Vec<&RunInstance> {
    runs.iter().filter(|run| !run.is_finished()).collect()
}

/// Finished runs, most recently finished first.
#[must_use]
pub fn finished_runs(runs: &[RunInstance]) -> Vec<&RunInstance> {
    let mut done: Vec<&RunInstance> = finished(runs).collect();
    done.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
    done
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0_u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn saturating_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
