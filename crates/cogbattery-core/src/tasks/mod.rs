//! The four battery tasks.
//!
//! Each task is a self-contained state machine. It holds only its own
//! counters and receives everything else (timers, randomness, the observer,
//! the current time) through a [`TaskContext`] on every call.

pub mod digit_span;
pub mod memory;
pub mod reaction;
pub mod stroop;

use rand::RngCore;
use tokio::time::Instant;

use crate::config::BatteryConfig;
use crate::model::{Color, Pair, TaskKind};
use crate::observer::{Frame, SessionObserver};
use crate::results::{DigitSpanOutcome, MemoryOutcome, ReactionOutcome, StroopOutcome};
use crate::timer::{TimerKind, TimerService};

/// A participant action routed to the active task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Free-text answer (memory recall, digit span).
    Text(String),
    /// The digit-span entry as currently typed, not yet submitted.
    Entry(String),
    /// Color choice (Stroop).
    Color(Color),
    /// Response key (reaction time).
    Respond,
    /// Move on to the next study pair without waiting for the dwell time.
    SkipStudy,
}

/// Everything a task may touch while handling one event.
pub struct TaskContext<'a> {
    pub timers: &'a mut dyn TimerService,
    pub rng: &'a mut dyn RngCore,
    pub observer: &'a dyn SessionObserver,
    pub now: Instant,
}

impl TaskContext<'_> {
    pub fn emit(&self, frame: Frame) {
        self.observer.on_frame(&frame);
    }
}

/// Result of a task that reached its terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Memory(MemoryOutcome),
    Stroop(StroopOutcome),
    DigitSpan(DigitSpanOutcome),
    Reaction(ReactionOutcome),
}

impl TaskOutcome {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskOutcome::Memory(_) => TaskKind::Memory,
            TaskOutcome::Stroop(_) => TaskKind::Stroop,
            TaskOutcome::DigitSpan(_) => TaskKind::DigitSpan,
            TaskOutcome::Reaction(_) => TaskKind::Reaction,
        }
    }
}

/// Common interface of the battery tasks.
pub trait BatteryTask: Send {
    fn kind(&self) -> TaskKind;

    /// Enter the task from its initial state and arm its first timer.
    fn start(&mut self, ctx: &mut TaskContext<'_>);

    /// Handle an accepted expiration of the timer in slot `kind`.
    fn on_timer(&mut self, kind: TimerKind, ctx: &mut TaskContext<'_>);

    /// Handle a participant action. Actions the current state does not
    /// expect are ignored.
    fn on_input(&mut self, input: Input, ctx: &mut TaskContext<'_>);

    /// The task's result once it reached its terminal state.
    fn outcome(&self) -> Option<TaskOutcome>;
}

/// Build a fresh task of `kind`.
pub fn new_task(kind: TaskKind, config: &BatteryConfig, pairs: &[Pair]) -> Box<dyn BatteryTask> {
    match kind {
        TaskKind::Memory => Box::new(memory::MemoryTask::new(
            config.memory.clone(),
            pairs.to_vec(),
        )),
        TaskKind::Stroop => Box::new(stroop::StroopTask::new(config.stroop.clone())),
        TaskKind::DigitSpan => Box::new(digit_span::DigitSpanTask::new(
            config.digit_span.clone(),
        )),
        TaskKind::Reaction => Box::new(reaction::ReactionTask::new(config.reaction.clone())),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio::time::Instant;

    use super::{BatteryTask, Input, TaskContext};
    use crate::observer::{Frame, RecordingObserver};
    use crate::timer::{ManualTimers, Schedule, TimerKind, TimerService};

    /// Drives a single task with manual timers and a virtual clock.
    pub struct Harness {
        pub timers: ManualTimers,
        pub rng: StdRng,
        pub observer: RecordingObserver,
        pub now: Instant,
    }

    impl Harness {
        pub fn new(seed: u64) -> Self {
            Self {
                timers: ManualTimers::new(),
                rng: StdRng::seed_from_u64(seed),
                observer: RecordingObserver::new(),
                now: Instant::now(),
            }
        }

        fn ctx(&mut self) -> TaskContext<'_> {
            TaskContext {
                timers: &mut self.timers,
                rng: &mut self.rng,
                observer: &self.observer,
                now: self.now,
            }
        }

        pub fn start(&mut self, task: &mut dyn BatteryTask) {
            task.start(&mut self.ctx());
        }

        pub fn input(&mut self, task: &mut dyn BatteryTask, input: Input) {
            task.on_input(input, &mut self.ctx());
        }

        /// Advance the clock by the armed schedule of `kind` and deliver it.
        /// Returns `false` if nothing was armed.
        pub fn fire(&mut self, task: &mut dyn BatteryTask, kind: TimerKind) -> bool {
            let Some(fired) = self.timers.fire(kind) else {
                return false;
            };
            if let Some(Schedule::Once(d) | Schedule::Every(d)) = self.timers.scheduled(kind) {
                self.now += d;
            }
            assert!(self.timers.accept(fired));
            task.on_timer(kind, &mut self.ctx());
            true
        }

        pub fn advance(&mut self, by: Duration) {
            self.now += by;
        }

        pub fn frames(&self) -> Vec<Frame> {
            self.observer.frames()
        }

        pub fn last_frame(&self) -> Option<Frame> {
            self.observer.frames().last().cloned()
        }
    }
}
