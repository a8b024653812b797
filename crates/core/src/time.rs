//! Wall clock and the calendar arithmetic the analytics run on.
//!
//! Timestamps are stored in UTC; days and windows are resolved here so the
//! streak and the weekly count agree on what "today" means.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Where "now" comes from when a run is started or finished.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }

    /// Move a fixed clock forward, e.g. across a workout. No effect on the
    /// system clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(at) = self {
            *at += delta;
        }
    }
}

/// Calendar day of `at` as seen in `tz`.
#[must_use]
pub fn local_day<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

/// True when `at` lies in the `days` long window ending at `now`.
///
/// The start is exclusive: a run finished exactly `days` ago is outside.
#[must_use]
pub fn within_trailing_days(at: DateTime<Utc>, now: DateTime<Utc>, days: i64) -> bool {
    at > now - Duration::days(days)
}

/// Total of the durations rounded to whole minutes, half up.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#[must_use]
pub fn rounded_minutes(durations: impl Iterator<Item = Duration>) -> i64 {
    let millis: i64 = durations.map(|elapsed| elapsed.num_milliseconds()).sum();
    (millis as f64 / 60_000.0).round() as i64
}

/// 2023-11-14T22:13:20Z, the "now" of every test.
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0).unwrap_or_default()
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
