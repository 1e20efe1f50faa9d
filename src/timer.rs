//! Rest countdown per exercise card.
//!
//! A timer only moves when [`RestTimer::advance`] is called with the current
//! instant, so callers decide where time comes from through a [`Clock`].

use std::time::{Duration, Instant};

pub const TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_DONE_WINDOW: Duration = Duration::from_millis(1500);

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running { remaining: u32, next_tick: Instant },
    Done { until: Instant },
}

/// What the timer control should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDisplay {
    Idle(u32),
    Running(u32),
    Done,
}

impl std::fmt::Display for TimerDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerDisplay::Idle(s) | TimerDisplay::Running(s) => write!(f, "⏱ {s}s"),
            TimerDisplay::Done => write!(f, "✅ Descanso!"),
        }
    }
}

/// `Idle -> Running -> Done -> Idle`.
///
/// Running shows the configured duration first and drops by one per tick;
/// zero is shown for a full tick before the timer switches to Done.
#[derive(Debug, Clone)]
pub struct RestTimer {
    duration: u32,
    done_window: Duration,
    phase: Phase,
}

impl RestTimer {
    pub fn new(duration: u32, done_window: Duration) -> Self {
        Self {
            duration,
            done_window,
            phase: Phase::Idle,
        }
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Start counting down. Ignored unless idle.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        self.phase = Phase::Running {
            remaining: self.duration,
            next_tick: now + TICK,
        };
        true
    }

    /// Apply every tick that has elapsed up to `now`.
    pub fn advance(&mut self, now: Instant) {
        loop {
            match self.phase {
                Phase::Idle => return,
                Phase::Running {
                    remaining,
                    next_tick,
                } => {
                    if now < next_tick {
                        return;
                    }
                    self.phase = if remaining == 0 {
                        Phase::Done {
                            until: next_tick + self.done_window,
                        }
                    } else {
                        Phase::Running {
                            remaining: remaining - 1,
                            next_tick: next_tick + TICK,
                        }
                    };
                }
                Phase::Done { until } => {
                    if now >= until {
                        self.phase = Phase::Idle;
                    }
                    return;
                }
            }
        }
    }

    /// The start trigger is only usable while idle.
    pub fn can_start(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn is_active(&self) -> bool {
        !self.can_start()
    }

    pub fn display(&self) -> TimerDisplay {
        match self.phase {
            Phase::Idle => TimerDisplay::Idle(self.duration),
            Phase::Running { remaining, .. } => TimerDisplay::Running(remaining),
            Phase::Done { .. } => TimerDisplay::Done,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Clock that only moves when told to.
    #[derive(Clone)]
    pub(crate) struct ManualClock {
        now: Rc<Cell<Instant>>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self {
                now: Rc::new(Cell::new(Instant::now())),
            }
        }

        pub(crate) fn advance(&self, by: Duration) {
            self.now.set(self.now.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.now.get()
        }
    }

    #[test]
    fn counts_down_then_done_then_idle() {
        let clock = ManualClock::new();
        let mut timer = RestTimer::new(3, DEFAULT_DONE_WINDOW);
        assert_eq!(timer.display(), TimerDisplay::Idle(3));
        assert!(timer.start(clock.now()));

        let mut shown = vec![timer.display()];
        for _ in 0..4 {
            clock.advance(TICK);
            timer.advance(clock.now());
            shown.push(timer.display());
        }
        assert_eq!(
            shown,
            vec![
                TimerDisplay::Running(3),
                TimerDisplay::Running(2),
                TimerDisplay::Running(1),
                TimerDisplay::Running(0),
                TimerDisplay::Done,
            ]
        );

        clock.advance(Duration::from_millis(1000));
        timer.advance(clock.now());
        assert_eq!(timer.display(), TimerDisplay::Done);
        assert!(!timer.can_start());

        clock.advance(Duration::from_millis(500));
        timer.advance(clock.now());
        assert_eq!(timer.display(), TimerDisplay::Idle(3));
        assert!(timer.can_start());
    }

    #[test]
    fn start_while_running_is_ignored() {
        let clock = ManualClock::new();
        let mut timer = RestTimer::new(5, DEFAULT_DONE_WINDOW);
        assert!(timer.start(clock.now()));
        clock.advance(TICK * 2);
        timer.advance(clock.now());
        assert!(!timer.start(clock.now()));
        assert_eq!(timer.display(), TimerDisplay::Running(3));
    }

    #[test]
    fn late_advance_catches_up() {
        let clock = ManualClock::new();
        let mut timer = RestTimer::new(3, DEFAULT_DONE_WINDOW);
        timer.start(clock.now());
        clock.advance(Duration::from_millis(2500));
        timer.advance(clock.now());
        assert_eq!(timer.display(), TimerDisplay::Running(1));

        clock.advance(Duration::from_secs(60));
        timer.advance(clock.now());
        assert_eq!(timer.display(), TimerDisplay::Idle(3));
    }

    #[test]
    fn display_text() {
        assert_eq!(TimerDisplay::Idle(60).to_string(), "⏱ 60s");
        assert_eq!(TimerDisplay::Done.to_string(), "✅ Descanso!");
    }
}
