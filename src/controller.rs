//! Application state and the single dispatch point for user events.

use std::collections::HashMap;
use std::time::Duration;

use crate::filters::{self, Choice, FilterSelection};
use crate::normalize::ExerciseRecord;
use crate::progress::{ExerciseIdentity, ProgressStore};
use crate::render::{ExerciseView, Group, group_by_workout_day};
use crate::sheet::SheetError;
use crate::storage::KeyValueStore;
use crate::timer::{Clock, RestTimer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PlanChanged(Choice),
    WorkoutDayChanged(Choice),
    LoadEdited {
        identity: ExerciseIdentity,
        value: String,
    },
    ToggleCompleted(ExerciseIdentity),
    ClearClicked,
    TimerStart {
        control: ExerciseIdentity,
        duration: u32,
    },
    Tick,
}

/// Result of [`Controller::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rerendered,
    LoadSaved,
    Toggled(bool),
    Cleared(usize),
    TimerStarted,
    Ticked,
    /// Nothing changed: the dataset is unavailable, the target is unknown,
    /// or the timer was already running.
    Ignored,
}

#[derive(Debug, Default)]
pub enum Dataset {
    #[default]
    Loading,
    Ready(Vec<ExerciseRecord>),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct AppState {
    pub dataset: Dataset,
    pub selection: FilterSelection,
    pub plans: Vec<String>,
    pub workout_days: Vec<String>,
    pub groups: Vec<Group>,
    pub timers: HashMap<ExerciseIdentity, RestTimer>,
}

impl AppState {
    pub fn timer(&self, control: &ExerciseIdentity) -> Option<&RestTimer> {
        self.timers.get(control)
    }

    pub fn any_timer_active(&self) -> bool {
        self.timers.values().any(RestTimer::is_active)
    }
}

pub struct Controller<S: KeyValueStore> {
    state: AppState,
    progress: ProgressStore<S>,
    clock: Box<dyn Clock>,
    done_window: Duration,
}

impl<S: KeyValueStore> Controller<S> {
    pub fn new(progress: ProgressStore<S>, clock: Box<dyn Clock>, done_window: Duration) -> Self {
        Self {
            state: AppState::default(),
            progress,
            clock,
            done_window,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Install the outcome of the one-shot sheet load.
    pub fn finish_loading(&mut self, result: Result<Vec<ExerciseRecord>, SheetError>) {
        match result {
            Ok(records) => {
                log::info!("Dataset ready with {} exercises", records.len());
                self.state.plans = filters::available_plans(&records);
                self.state.selection = FilterSelection::default();
                self.state.workout_days = filters::available_workout_days(&records, &Choice::All);
                self.state.dataset = Dataset::Ready(records);
                self.rerender();
            }
            Err(e) => {
                log::error!("Erro ao carregar planilha: {e}");
                self.state.dataset = Dataset::Failed(e.to_string());
                self.state.plans.clear();
                self.state.workout_days.clear();
                self.state.groups.clear();
            }
        }
    }

    fn rerender(&mut self) {
        if let Dataset::Ready(records) = &self.state.dataset {
            let filtered = filters::filter(records, &self.state.selection);
            self.state.groups = group_by_workout_day(&filtered, &self.progress);
        }
    }

    pub fn dispatch(&mut self, event: Event) -> Outcome {
        if !matches!(self.state.dataset, Dataset::Ready(_)) {
            return Outcome::Ignored;
        }
        match event {
            Event::PlanChanged(plan) => {
                if let Dataset::Ready(records) = &self.state.dataset {
                    self.state.workout_days = self.state.selection.select_plan(records, plan);
                }
                self.rerender();
                Outcome::Rerendered
            }
            Event::WorkoutDayChanged(day) => {
                if let Dataset::Ready(records) = &self.state.dataset {
                    self.state.selection.select_workout_day(records, day);
                }
                self.rerender();
                Outcome::Rerendered
            }
            Event::LoadEdited { identity, value } => {
                let mut views = views_mut(&mut self.state.groups, &identity);
                let Some(first) = views.next() else {
                    return Outcome::Ignored;
                };
                first.on_load_change(&mut self.progress, &value);
                let load = first.display_load.clone();
                for view in views {
                    view.display_load = load.clone();
                }
                Outcome::LoadSaved
            }
            Event::ToggleCompleted(identity) => {
                let mut views = views_mut(&mut self.state.groups, &identity);
                let Some(first) = views.next() else {
                    return Outcome::Ignored;
                };
                let done = first.on_toggle_completed(&mut self.progress);
                for view in views {
                    view.display_completed = done;
                }
                Outcome::Toggled(done)
            }
            Event::ClearClicked => {
                let removed = self.progress.clear_all();
                self.rerender();
                Outcome::Cleared(removed)
            }
            Event::TimerStart { control, duration } => {
                let now = self.clock.now();
                let window = self.done_window;
                let timer = self
                    .state
                    .timers
                    .entry(control)
                    .or_insert_with(|| RestTimer::new(duration, window));
                if timer.duration() != duration && timer.can_start() {
                    *timer = RestTimer::new(duration, window);
                }
                if timer.start(now) {
                    Outcome::TimerStarted
                } else {
                    Outcome::Ignored
                }
            }
            Event::Tick => {
                let now = self.clock.now();
                for timer in self.state.timers.values_mut() {
                    timer.advance(now);
                }
                Outcome::Ticked
            }
        }
    }
}

/// Every rendered card for `identity`; duplicates of one exercise share it.
fn views_mut<'a>(
    groups: &'a mut [Group],
    identity: &'a ExerciseIdentity,
) -> impl Iterator<Item = &'a mut ExerciseView> + 'a {
    groups
        .iter_mut()
        .flat_map(|g| g.exercises_mut().iter_mut())
        .filter(move |v| &v.identity == identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Load, normalize_rows};
    use crate::progress::ProgressRecord;
    use crate::storage::MemoryStore;
    use crate::timer::tests::ManualClock;
    use crate::timer::{DEFAULT_DONE_WINDOW, TICK, TimerDisplay};

    fn dataset() -> Vec<ExerciseRecord> {
        let rows: Vec<Vec<(String, String)>> = [
            ("A", "Dia 1", "Agachamento", "40", "60"),
            ("A", "Dia 2", "Supino", "30", ""),
            ("B", "Dia 1", "Terra", "80", "90s"),
            ("B", "Dia 3", "Remada", "", "0"),
        ]
        .iter()
        .map(|(plan, day, name, load, rest)| {
            vec![
                ("Ficha".to_string(), plan.to_string()),
                ("Treino".to_string(), day.to_string()),
                ("Exercício".to_string(), name.to_string()),
                ("Carga (kg)".to_string(), load.to_string()),
                ("Descanso (s)".to_string(), rest.to_string()),
            ]
        })
        .collect();
        normalize_rows(&rows).unwrap()
    }

    fn controller() -> (Controller<MemoryStore>, ManualClock) {
        let clock = ManualClock::new();
        let mut c = Controller::new(
            ProgressStore::new(MemoryStore::new()),
            Box::new(clock.clone()),
            DEFAULT_DONE_WINDOW,
        );
        c.finish_loading(Ok(dataset()));
        (c, clock)
    }

    fn titles(c: &Controller<MemoryStore>) -> Vec<String> {
        c.state().groups.iter().map(|g| g.title().to_string()).collect()
    }

    fn view<'a>(c: &'a Controller<MemoryStore>, name: &str) -> &'a ExerciseView {
        c.state()
            .groups
            .iter()
            .flat_map(|g| g.exercises())
            .find(|v| v.record.exercise_name == name)
            .unwrap()
    }

    #[test]
    fn events_are_ignored_while_loading() {
        let mut c = Controller::new(
            ProgressStore::new(MemoryStore::new()),
            Box::new(ManualClock::new()),
            DEFAULT_DONE_WINDOW,
        );
        assert!(matches!(c.state().dataset, Dataset::Loading));
        assert_eq!(c.dispatch(Event::ClearClicked), Outcome::Ignored);
        assert!(c.state().groups.is_empty());
    }

    #[test]
    fn failed_load_leaves_dataset_empty() {
        let mut c = Controller::new(
            ProgressStore::new(MemoryStore::new()),
            Box::new(ManualClock::new()),
            DEFAULT_DONE_WINDOW,
        );
        c.finish_loading(Err(SheetError::Http(500, String::new())));
        match &c.state().dataset {
            Dataset::Failed(msg) => assert_eq!(msg, "HTTP 500"),
            other => panic!("unexpected dataset: {other:?}"),
        }
        assert!(c.state().groups.is_empty());
        assert_eq!(
            c.dispatch(Event::PlanChanged(Choice::Only("A".into()))),
            Outcome::Ignored
        );
    }

    #[test]
    fn initial_render_groups_everything() {
        let (c, _) = controller();
        assert_eq!(c.state().plans, vec!["A", "B"]);
        assert_eq!(c.state().workout_days, vec!["Dia 1", "Dia 2", "Dia 3"]);
        assert_eq!(titles(&c), vec!["Dia 1", "Dia 2", "Dia 3"]);
        assert_eq!(c.state().groups[0].exercises().len(), 2);
    }

    #[test]
    fn plan_change_recomputes_days_and_resets_selection() {
        let (mut c, _) = controller();
        c.dispatch(Event::WorkoutDayChanged(Choice::Only("Dia 3".into())));
        assert_eq!(titles(&c), vec!["Dia 3"]);

        c.dispatch(Event::PlanChanged(Choice::Only("A".into())));
        assert_eq!(c.state().workout_days, vec!["Dia 1", "Dia 2"]);
        assert_eq!(c.state().selection.workout_day, Choice::All);
        assert_eq!(titles(&c), vec!["Dia 1", "Dia 2"]);
    }

    #[test]
    fn toggle_then_clear_restores_base_loads() {
        let (mut c, _) = controller();
        let id = view(&c, "Supino").identity.clone();

        c.dispatch(Event::LoadEdited {
            identity: id.clone(),
            value: "35".into(),
        });
        assert_eq!(c.dispatch(Event::ToggleCompleted(id.clone())), Outcome::Toggled(true));
        assert_eq!(view(&c, "Supino").display_load, Load::Number(35.0));
        assert!(view(&c, "Supino").display_completed);
        assert_eq!(
            c.progress.get(&id),
            Some(ProgressRecord {
                load: Some(Load::Number(35.0)),
                completed: Some(true),
            })
        );

        assert_eq!(c.dispatch(Event::ClearClicked), Outcome::Cleared(1));
        assert_eq!(view(&c, "Supino").display_load, Load::Number(30.0));
        assert!(!view(&c, "Supino").display_completed);
    }

    #[test]
    fn progress_survives_filter_changes() {
        let (mut c, _) = controller();
        let id = view(&c, "Terra").identity.clone();
        c.dispatch(Event::ToggleCompleted(id));
        c.dispatch(Event::PlanChanged(Choice::Only("A".into())));
        c.dispatch(Event::PlanChanged(Choice::All));
        assert!(view(&c, "Terra").display_completed);
    }

    #[test]
    fn unknown_identity_is_ignored() {
        let (mut c, _) = controller();
        let ghost = ExerciseIdentity::new("Z", "Z", "Z");
        assert_eq!(c.dispatch(Event::ToggleCompleted(ghost)), Outcome::Ignored);
    }

    #[test]
    fn rest_controls_follow_rest_text() {
        let (c, _) = controller();
        assert_eq!(view(&c, "Agachamento").rest, Some(60));
        assert_eq!(view(&c, "Terra").rest, Some(90));
        assert_eq!(view(&c, "Supino").rest, None);
        assert_eq!(view(&c, "Remada").rest, None);
    }

    #[test]
    fn timers_run_independently() {
        let (mut c, clock) = controller();
        let squat = view(&c, "Agachamento").identity.clone();
        let deadlift = view(&c, "Terra").identity.clone();

        assert_eq!(
            c.dispatch(Event::TimerStart {
                control: squat.clone(),
                duration: 3,
            }),
            Outcome::TimerStarted
        );
        clock.advance(TICK);
        c.dispatch(Event::Tick);
        c.dispatch(Event::TimerStart {
            control: deadlift.clone(),
            duration: 2,
        });
        assert_eq!(
            c.dispatch(Event::TimerStart {
                control: squat.clone(),
                duration: 3,
            }),
            Outcome::Ignored
        );

        clock.advance(TICK);
        c.dispatch(Event::Tick);
        let display = |c: &Controller<MemoryStore>, id: &ExerciseIdentity| {
            c.state().timer(id).map(RestTimer::display)
        };
        assert_eq!(display(&c, &squat), Some(TimerDisplay::Running(1)));
        assert_eq!(display(&c, &deadlift), Some(TimerDisplay::Running(1)));
        assert!(c.state().any_timer_active());

        for _ in 0..6 {
            clock.advance(TICK);
            c.dispatch(Event::Tick);
        }
        assert_eq!(display(&c, &squat), Some(TimerDisplay::Idle(3)));
        assert_eq!(display(&c, &deadlift), Some(TimerDisplay::Idle(2)));
        assert!(!c.state().any_timer_active());
    }
}
