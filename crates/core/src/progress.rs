use serde::Serialize;

use crate::model::{ExerciseRecord, RunInstance};

/// Completed sets over total sets, for a whole run or a single exercise.
///
/// Expects normalized input; callers migrate before reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub done_sets: u32,
    pub total_sets: u32,
    /// `round(done / total * 100)`, or 0 for an empty run.
    pub percent: u32,
}

impl SessionProgress {
    #[must_use]
    pub fn of(run: &RunInstance) -> Self {
        let (done, total) = run.records().fold((0_u32, 0_u32), |(done, total), record| {
            (
                done.saturating_add(record.completed_sets()),
                total.saturating_add(record.reps),
            )
        });
        Self::from_counts(done, total)
    }

    #[must_use]
    pub fn of_exercise(record: &ExerciseRecord) -> Self {
        Self::from_counts(record.completed_sets(), record.reps)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_counts(done_sets: u32, total_sets: u32) -> Self {
        let percent = if total_sets == 0 {
            0
        } else {
            (f64::from(done_sets) / f64::from(total_sets) * 100.0).round() as u32
        };
        Self {
            done_sets,
            total_sets,
            percent,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_sets > 0 && self.done_sets >= self.total_sets
    }
}

/// Weights of the sets that are both done and carry a finite weight.
pub(crate) fn completed_weights(record: &ExerciseRecord) -> impl Iterator<Item = f64> + '_ {
    (0..record.reps as usize).filter_map(|i| {
        let done = record.done.get(i).copied().unwrap_or(false);
        let weight = record.weights.get(i).copied()?;
        (done && weight.is_finite()).then_some(weight)
    })
}

/// Mean weight over completed sets.
///
/// `None` means no set qualified. It is not a zero and must not be plotted
/// or summed as one.
#[must_use]
pub fn average_completed_weight(record: &ExerciseRecord) -> Option<f64> {
    let (sum, count) = completed_weights(record).fold((0.0, 0_u32), |(sum, count), weight| {
        (sum + weight, count + 1)
    });
    (count > 0).then(|| sum / f64::from(count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunSection, SectionId};

    fn record(weights: Vec<f64>, done: Vec<bool>) -> ExerciseRecord {
        ExerciseRecord {
            title: "DC".into(),
            reps: u32::try_from(done.len()).unwrap(),
            weights,
            done,
            ..ExerciseRecord::default()
        }
    }

    #[test]
    fn half_done_session_is_fifty_percent() {
        let run = RunInstance {
            sections: vec![RunSection {
                id: SectionId::new("s1"),
                title: "Dos".into(),
                items: vec![
                    record(vec![40.0, 40.0], vec![true, true]),
                    record(vec![60.0, 60.0], vec![false, false]),
                ],
            }],
            ..RunInstance::default()
        };
        let progress = SessionProgress::of(&run);
        assert_eq!(
            progress,
            SessionProgress {
                done_sets: 2,
                total_sets: 4,
                percent: 50
            }
        );
        assert!(!progress.is_complete());
    }

    #[test]
    fn empty_session_reports_zero() {
        let progress = SessionProgress::of(&RunInstance::default());
        assert_eq!(progress.percent, 0);
        assert_eq!(progress.total_sets, 0);
    }

    #[test]
    fn percent_is_rounded() {
        assert_eq!(SessionProgress::from_counts(1, 3).percent, 33);
        assert_eq!(SessionProgress::from_counts(2, 3).percent, 67);
        assert!(SessionProgress::from_counts(3, 3).is_complete());
    }

    #[test]
    fn single_exercise_ratio() {
        let progress = SessionProgress::of_exercise(&record(vec![1.0; 4], vec![true, false, true, true]));
        assert_eq!(progress.done_sets, 3);
        assert_eq!(progress.percent, 75);
    }

    #[test]
    fn average_uses_completed_sets_only() {
        let avg = average_completed_weight(&record(vec![50.0, 52.5, 55.0], vec![true, true, false]));
        assert!((avg.unwrap() - 51.25).abs() < 1e-9);
    }

    #[test]
    fn nothing_done_is_no_data_not_zero() {
        assert_eq!(
            average_completed_weight(&record(vec![40.0, 40.0], vec![false, false])),
            None
        );
    }

    #[test]
    fn non_finite_weights_are_skipped() {
        let avg = average_completed_weight(&record(
            vec![100.0, f64::NAN, 105.0],
            vec![true, true, true],
        ));
        assert!((avg.unwrap() - 102.5).abs() < 1e-9);

        let only_nan = average_completed_weight(&record(vec![f64::NAN], vec![true]));
        assert_eq!(only_nan, None);
    }
}
