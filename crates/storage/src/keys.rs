/// Logical keys under which the two collections are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    pub programs: String,
    pub runs: String,
}

impl StoreKeys {
    /// Keys written by the current schema.
    #[must_use]
    pub fn current() -> Self {
        Self {
            programs: "gym_programs_v2".into(),
            runs: "gym_runs_v2".into(),
        }
    }

    /// Keys written by the first schema (scalar `currentWeight`, no per-set arrays).
    #[must_use]
    pub fn legacy() -> Self {
        Self {
            programs: "gym_programs_v1".into(),
            runs: "gym_runs_v1".into(),
        }
    }

    /// Both keys, labelled for logging.
    pub(crate) fn entries(&self) -> [(&'static str, &str); 2] {
        [("programs", &self.programs), ("runs", &self.runs)]
    }
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self::current()
    }
}
