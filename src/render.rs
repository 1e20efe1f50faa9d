//! Grouping of filtered rows into per-day cards with their stored progress.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::{ExerciseRecord, Load};
use crate::progress::{ExerciseIdentity, ProgressRecord, ProgressStore};
use crate::storage::KeyValueStore;

pub const NO_RESULTS: &str = "Nenhum exercício encontrado";

static LEADING_INT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)").ok());

/// Rest duration for the timer control, when the text starts with a
/// positive whole number of seconds.
pub fn rest_duration(rest: &str) -> Option<u32> {
    let caps = LEADING_INT.as_ref()?.captures(rest)?;
    let secs: i64 = caps.get(1)?.as_str().parse().ok()?;
    u32::try_from(secs).ok().filter(|s| *s > 0)
}

/// Everything a card needs to draw one exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseView {
    pub identity: ExerciseIdentity,
    pub record: ExerciseRecord,
    pub display_load: Load,
    pub display_completed: bool,
    pub rest: Option<u32>,
}

impl ExerciseView {
    pub fn resolve<S: KeyValueStore>(record: &ExerciseRecord, progress: &ProgressStore<S>) -> Self {
        let identity = ExerciseIdentity::of(record);
        let stored = progress.get(&identity).unwrap_or_default();
        Self {
            display_load: stored.load.unwrap_or_else(|| record.base_load.clone()),
            display_completed: stored.completed.unwrap_or(false),
            rest: rest_duration(&record.rest_seconds),
            identity,
            record: record.clone(),
        }
    }

    /// Store a new load, leaving the completion flag alone.
    pub fn on_load_change<S: KeyValueStore>(&mut self, progress: &mut ProgressStore<S>, value: &str) {
        let load = Load::parse(value);
        progress.merge(&self.identity, ProgressRecord::with_load(load.clone()));
        self.display_load = load;
    }

    /// Flip the stored completion flag, saving it together with the load
    /// currently on screen. Returns the new flag.
    pub fn on_toggle_completed<S: KeyValueStore>(&mut self, progress: &mut ProgressStore<S>) -> bool {
        let current = progress
            .get(&self.identity)
            .and_then(|p| p.completed)
            .unwrap_or(false);
        let patch = ProgressRecord {
            load: Some(self.display_load.clone()),
            completed: Some(!current),
        };
        progress.merge(&self.identity, patch);
        self.display_completed = !current;
        self.display_completed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Group {
    Day {
        workout_day: String,
        exercises: Vec<ExerciseView>,
    },
    NoResults,
}

impl Group {
    pub fn title(&self) -> &str {
        match self {
            Group::Day { workout_day, .. } => workout_day,
            Group::NoResults => NO_RESULTS,
        }
    }

    pub fn exercises(&self) -> &[ExerciseView] {
        match self {
            Group::Day { exercises, .. } => exercises,
            Group::NoResults => &[],
        }
    }

    pub fn exercises_mut(&mut self) -> &mut [ExerciseView] {
        match self {
            Group::Day { exercises, .. } => exercises,
            Group::NoResults => Default::default(),
        }
    }
}

/// Group `filtered` by workout day in first-seen order.
///
/// Never returns an empty list: no rows produce a single [`Group::NoResults`].
pub fn group_by_workout_day<S: KeyValueStore>(
    filtered: &[&ExerciseRecord],
    progress: &ProgressStore<S>,
) -> Vec<Group> {
    let mut groups: Vec<(String, Vec<ExerciseView>)> = Vec::new();
    for record in filtered {
        let view = ExerciseView::resolve(record, progress);
        match groups.iter_mut().find(|(day, _)| *day == record.workout_day) {
            Some((_, views)) => views.push(view),
            None => groups.push((record.workout_day.clone(), vec![view])),
        }
    }
    if groups.is_empty() {
        return vec![Group::NoResults];
    }
    groups
        .into_iter()
        .map(|(workout_day, exercises)| Group::Day {
            workout_day,
            exercises,
        })
        .collect()
}
