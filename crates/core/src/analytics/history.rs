use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::RunInstance;
use crate::progress::{average_completed_weight, completed_weights};

/// Exercises shown on the dashboard need at least this many sessions.
pub const DASHBOARD_MIN_SESSIONS: usize = 2;
/// Number of exercise charts on the dashboard.
pub const DASHBOARD_LIMIT: usize = 4;

/// One session's completed-sets average for an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightPoint {
    pub finished_at: DateTime<Utc>,
    pub weight: f64,
    /// Sets that contributed to `weight`.
    pub sets: u32,
}

/// Chronological weight series for one exercise title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseSeries {
    pub title: String,
    pub points: Vec<WeightPoint>,
}

/// First/last/best figures of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExerciseTrend {
    pub first: f64,
    pub last: f64,
    pub change: f64,
    pub max: f64,
}

impl ExerciseSeries {
    #[must_use]
    pub fn sessions(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn trend(&self) -> Option<ExerciseTrend> {
        let first = self.points.first()?.weight;
        let last = self.points.last()?.weight;
        let max = self
            .points
            .iter()
            .map(|point| point.weight)
            .fold(f64::NEG_INFINITY, f64::max);
        Some(ExerciseTrend {
            first,
            last,
            change: last - first,
            max,
        })
    }
}

/// Build the per-exercise weight series from scratch.
///
/// Titles are trimmed and blank titles skipped. Each finished run contributes
/// at most one point per title, taken from the first record of that title
/// with at least one completed set; runs without one leave no point at all.
/// Series come back sorted by title.
#[must_use]
pub fn weight_history(runs: &[RunInstance]) -> Vec<ExerciseSeries> {
    let mut finished: Vec<(&RunInstance, DateTime<Utc>)> = runs
        .iter()
        .filter_map(|run| run.finished_at.map(|at| (run, at)))
        .collect();
    finished.sort_by_key(|(_, at)| *at);

    let mut by_title: BTreeMap<String, Vec<WeightPoint>> = BTreeMap::new();
    for (run, finished_at) in finished {
        let mut seen: HashSet<&str> = HashSet::new();
        for record in run.records() {
            let title = record.title.trim();
            if title.is_empty() || seen.contains(title) {
                continue;
            }
            let Some(weight) = average_completed_weight(record) else {
                continue;
            };
            seen.insert(title);
            let sets = u32::try_from(completed_weights(record).count()).unwrap_or(u32::MAX);
            by_title
                .entry(title.to_owned())
                .or_default()
                .push(WeightPoint {
                    finished_at,
                    weight,
                    sets,
                });
        }
    }

    by_title
        .into_iter()
        .map(|(title, points)| ExerciseSeries { title, points })
        .collect()
}

/// Most-trained exercises: at least `min_sessions` points, most points first,
/// ties broken by title.
#[must_use]
pub fn top_exercises(
    series: &[ExerciseSeries],
    min_sessions: usize,
    limit: usize,
) -> Vec<&ExerciseSeries> {
    let mut ranked: Vec<&ExerciseSeries> = series
        .iter()
        .filter(|s| s.sessions() >= min_sessions)
        .collect();
    ranked.sort_by(|a, b| {
        b.sessions()
            .cmp(&a.sessions())
            .then_with(|| a.title.cmp(&b.title))
    });
    ranked.truncate(limit);
    ranked
}
