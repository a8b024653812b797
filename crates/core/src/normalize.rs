//! Per-record repair of the set arrays.
//!
//! Records reach the engine fresh from the session factory, half-edited
//! (`reps` changed after sets existed) or from the first schema, which had a
//! scalar `currentWeight` and no `weights` array. Whatever the origin, the
//! output satisfies `weights.len() == done.len() == reps`, keeps existing
//! values in place, and never fails.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::{ExerciseId, ExerciseRecord};

/// Upper bound on the set count of a single record.
pub const MAX_REPS: u32 = 1000;

/// Repair one persisted exercise value into a consistent record.
///
/// Total over every JSON value: missing fields and wrong types fall back to
/// safe defaults, a non-object yields a one-set record with empty metadata.
#[must_use]
pub fn normalize_exercise(raw: &Value) -> ExerciseRecord {
    let done: Option<Vec<bool>> = raw
        .get("done")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(truthy).collect());
    let weights: Vec<f64> = raw
        .get("weights")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(weight_or_nan).collect())
        .unwrap_or_default();
    let current_weight = raw.get("currentWeight").and_then(finite_number);
    let reps = resolve_reps(
        raw.get("reps").and_then(finite_number),
        done.as_deref(),
    );
    let (weights, done) = fit_sets(reps, weights, done.unwrap_or_default(), current_weight);

    ExerciseRecord {
        id: ExerciseId::new(lenient_string(raw.get("id"))),
        title: lenient_string(raw.get("title")),
        reps,
        weights,
        done,
        notes: raw.get("notes").and_then(Value::as_str).map(str::to_owned),
        current_weight,
    }
}

impl ExerciseRecord {
    /// Same repair as [`normalize_exercise`] for an already-typed record.
    #[must_use]
    pub fn normalized(self) -> Self {
        let reps = if self.reps > 0 {
            self.reps.min(MAX_REPS)
        } else {
            reps_from_done(&self.done)
        };
        let legacy = self.current_weight.filter(|w| w.is_finite());
        let (weights, done) = fit_sets(reps, self.weights, self.done, legacy);
        Self {
            reps,
            weights,
            done,
            ..self
        }
    }
}

pub(crate) fn resolve_reps(reps: Option<f64>, done: Option<&[bool]>) -> u32 {
    match reps {
        Some(reps) if reps > 0.0 => clamp_reps(reps.ceil()),
        _ => done.map_or(1, reps_from_done),
    }
}

fn reps_from_done(done: &[bool]) -> u32 {
    if done.is_empty() {
        return 1;
    }
    u32::try_from(done.len()).map_or(MAX_REPS, |len| len.min(MAX_REPS))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_reps(reps: f64) -> u32 {
    reps.clamp(1.0, f64::from(MAX_REPS)) as u32
}

fn fit_sets(
    reps: u32,
    mut weights: Vec<f64>,
    mut done: Vec<bool>,
    legacy_weight: Option<f64>,
) -> (Vec<f64>, Vec<bool>) {
    let len = reps as usize;
    weights.truncate(len);
    let seed = legacy_weight
        .or_else(|| weights.first().copied())
        .unwrap_or(0.0);
    weights.resize(len, seed);

    done.truncate(len);
    done.resize(len, false);
    (weights, done)
}

//
// ─── LENIENT FIELD READERS ─────────────────────────────────────────────────────
//

pub(crate) fn finite_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

/// Non-numeric weight entries stay in position as NaN.
fn weight_or_nan(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

/// Reads ids and titles written either as strings or as numbers.
pub(crate) fn lenient_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Epoch milliseconds or an RFC 3339 string; anything else reads as absent.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn lenient_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(text) = value.as_str() {
        return DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|at| at.with_timezone(&Utc));
    }
    let millis = finite_number(value)?;
    DateTime::<Utc>::from_timestamp_millis(millis.trunc() as i64)
}
