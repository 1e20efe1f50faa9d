//! Plan / workout-day selection over the normalized dataset.

use std::collections::HashSet;

use crate::normalize::ExerciseRecord;

/// A filter value: either everything or one concrete plan/day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Choice {
    #[default]
    All,
    Only(String),
}

impl Choice {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(v) => v == value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub plan: Choice,
    pub workout_day: Choice,
}

impl FilterSelection {
    /// Switch plans and return the workout days now available.
    ///
    /// A concrete day that does not occur under the new plan is reset to
    /// [`Choice::All`].
    pub fn select_plan(&mut self, dataset: &[ExerciseRecord], plan: Choice) -> Vec<String> {
        self.plan = plan;
        let days = available_workout_days(dataset, &self.plan);
        if let Choice::Only(day) = &self.workout_day {
            if !days.contains(day) {
                log::debug!("Workout day {day:?} not in plan {:?}, resetting", self.plan);
                self.workout_day = Choice::All;
            }
        }
        days
    }

    /// Select a workout day. Days outside the current plan fall back to
    /// [`Choice::All`].
    pub fn select_workout_day(&mut self, dataset: &[ExerciseRecord], day: Choice) {
        self.workout_day = match day {
            Choice::Only(d) if !available_workout_days(dataset, &self.plan).contains(&d) => {
                Choice::All
            }
            other => other,
        };
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Distinct plans in first-seen order. The "all" option is not included.
pub fn available_plans(dataset: &[ExerciseRecord]) -> Vec<String> {
    distinct(dataset.iter().map(|r| r.plan.as_str()))
}

/// Distinct workout days under `plan`, in first-seen order.
pub fn available_workout_days(dataset: &[ExerciseRecord], plan: &Choice) -> Vec<String> {
    distinct(
        dataset
            .iter()
            .filter(|r| plan.matches(&r.plan))
            .map(|r| r.workout_day.as_str()),
    )
}

/// Rows matching both halves of `selection`, in original order.
pub fn filter<'a>(
    dataset: &'a [ExerciseRecord],
    selection: &FilterSelection,
) -> Vec<&'a ExerciseRecord> {
    dataset
        .iter()
        .filter(|r| selection.plan.matches(&r.plan) && selection.workout_day.matches(&r.workout_day))
        .collect()
}
