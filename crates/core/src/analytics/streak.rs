use std::collections::HashSet;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

use super::finished;
use crate::model::RunInstance;
use crate::time::local_day;

/// Longest streak the backward walk will count.
pub const STREAK_CAP_DAYS: u32 = 365;

/// Consecutive calendar days, ending today, with at least one finished run.
///
/// Days are local calendar days. Zero when nothing was finished today.
#[must_use]
pub fn streak(runs: &[RunInstance], now: DateTime<Utc>) -> u32 {
    streak_in(runs, now, &Local)
}

/// [`streak`] with calendar days taken in `tz`.
#[must_use]
pub fn streak_in<Tz: TimeZone>(runs: &[RunInstance], now: DateTime<Utc>, tz: &Tz) -> u32 {
    let workout_days: HashSet<NaiveDate> = finished(runs)
        .filter_map(|run| run.finished_at)
        .map(|at| local_day(at, tz))
        .collect();

    let mut day = local_day(now, tz);
    let mut streak = 0;
    while streak < STREAK_CAP_DAYS && workout_days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}
