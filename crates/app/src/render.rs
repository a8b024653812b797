//! Plain-text views for the command line.

use chrono::{DateTime, Local, Utc};
use gym_core::analytics::ExerciseSeries;
use gym_core::model::{ExerciseRecord, Program, RunInstance};
use gym_core::{SessionProgress, WorkoutStats};

fn weight(value: f64) -> String {
    if !value.is_finite() {
        "-".to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn programs(programs: &[&Program]) -> String {
    if programs.is_empty() {
        return finish(vec!["no programs yet; add one with import-program".into()]);
    }
    let mut lines = Vec::new();
    for program in programs {
        lines.push(format!(
            "{}  {} ({} sets)",
            program.id,
            program.title,
            program.total_sets()
        ));
        for section in &program.sections {
            let items: Vec<String> = section
                .items
                .iter()
                .map(|item| format!("{} {}x{}kg", item.title, item.reps, weight(item.weight)))
                .collect();
            lines.push(format!("    {}: {}", section.title, items.join(", ")));
        }
    }
    finish(lines)
}

fn run_summary(run: &RunInstance) -> String {
    let progress = SessionProgress::of(run);
    let when = match (run.finished_at, run.duration()) {
        (Some(at), Some(elapsed)) => {
            format!("finished {} ({} min)", timestamp(at), elapsed.num_minutes())
        }
        _ => format!("started {}", timestamp(run.started_at)),
    };
    format!(
        "{}  {}  {}/{} sets  {}",
        run.id, run.title, progress.done_sets, progress.total_sets, when
    )
}

pub fn runs(active: &[RunInstance], finished: &[RunInstance]) -> String {
    let mut lines = vec!["Active:".to_string()];
    if active.is_empty() {
        lines.push("    none".into());
    }
    lines.extend(active.iter().map(|run| format!("    {}", run_summary(run))));
    lines.push("Finished:".into());
    if finished.is_empty() {
        lines.push("    none".into());
    }
    lines.extend(finished.iter().map(|run| format!("    {}", run_summary(run))));
    finish(lines)
}

fn record_line(position: usize, record: &ExerciseRecord) -> String {
    let sets: Vec<String> = record
        .weights
        .iter()
        .zip(&record.done)
        .map(|(w, done)| format!("[{}]{}", if *done { "x" } else { " " }, weight(*w)))
        .collect();
    let mut line = format!("    {position}. {}  {}", record.title, sets.join(" "));
    if let Some(notes) = &record.notes {
        line.push_str(&format!("  # {notes}"));
    }
    line
}

pub fn run(run: &RunInstance) -> String {
    let progress = SessionProgress::of(run);
    let mut lines = vec![
        format!("{} ({})", run.title, run.id),
        format!(
            "{}/{} sets done ({}%)",
            progress.done_sets, progress.total_sets, progress.percent
        ),
    ];
    for (index, section) in run.sections.iter().enumerate() {
        lines.push(format!("{}. {}", index + 1, section.title));
        lines.extend(
            section
                .items
                .iter()
                .enumerate()
                .map(|(position, record)| record_line(position + 1, record)),
        );
    }
    lines.push(match run.finished_at {
        Some(at) => format!("finished {}", timestamp(at)),
        None => "in progress".into(),
    });
    finish(lines)
}

pub fn stats(stats: &WorkoutStats) -> String {
    finish(vec![
        format!("workouts:        {}", stats.total_workouts),
        format!("this week:       {}", stats.this_week),
        format!("exercises:       {}", stats.distinct_exercises),
        format!("average weight:  {} kg", weight(stats.average_weight)),
        format!("streak:          {} days", stats.streak),
        format!("total time:      {} min", stats.total_minutes),
    ])
}

pub fn history(all: &[ExerciseSeries], top: &[ExerciseSeries]) -> String {
    if all.is_empty() {
        return finish(vec!["no completed sets yet".into()]);
    }
    let mut lines = Vec::new();
    if !top.is_empty() {
        lines.push("Most trained:".to_string());
        for series in top {
            if let Some(trend) = series.trend() {
                lines.push(format!(
                    "    {}  {} -> {} kg ({:+.1}), best {} kg over {} sessions",
                    series.title,
                    weight(trend.first),
                    weight(trend.last),
                    trend.change,
                    weight(trend.max),
                    series.sessions()
                ));
            }
        }
    }
    lines.push("All exercises:".into());
    for series in all {
        let points: Vec<String> = series
            .points
            .iter()
            .map(|point| {
                format!(
                    "{} {}",
                    point.finished_at.with_timezone(&Local).format("%m-%d"),
                    weight(point.weight)
                )
            })
            .collect();
        lines.push(format!("    {}: {}", series.title, points.join(", ")));
    }
    finish(lines)
}
