//! Simple reaction-time task.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::config::ReactionConfig;
use crate::model::TaskKind;
use crate::observer::Frame;
use crate::results::ReactionOutcome;
use crate::timer::{Schedule, TimerKind};

use super::{BatteryTask, Input, TaskContext, TaskOutcome};

/// Draw a delay uniformly from the configured inclusive range.
pub fn random_delay<R: Rng + ?Sized>(config: &ReactionConfig, rng: &mut R) -> Duration {
    let low = config.delay_min_ms.min(config.delay_max_ms);
    let high = config.delay_min_ms.max(config.delay_max_ms);
    Duration::from_millis(rng.gen_range(low..=high))
}

#[derive(Debug)]
enum ReactionState {
    Idle,
    /// Pre-stimulus delay of 1-based `trial`.
    Waiting { trial: u32 },
    Stimulus { trial: u32, shown_at: Instant },
    Done,
}

pub struct ReactionTask {
    config: ReactionConfig,
    state: ReactionState,
    outcome: ReactionOutcome,
}

impl ReactionTask {
    pub fn new(config: ReactionConfig) -> Self {
        Self {
            config,
            state: ReactionState::Idle,
            outcome: ReactionOutcome::default(),
        }
    }

    pub fn is_showing_stimulus(&self) -> bool {
        matches!(self.state, ReactionState::Stimulus { .. })
    }

    fn wait(&mut self, trial: u32, ctx: &mut TaskContext<'_>) {
        if trial > self.config.trials {
            ctx.timers.cancel(TimerKind::Deadline);
            self.state = ReactionState::Done;
            tracing::debug!(
                responses = self.outcome.latencies_ms.len(),
                misses = self.outcome.misses,
                "reaction task finished"
            );
            ctx.emit(Frame::TaskComplete {
                task: TaskKind::Reaction,
            });
            return;
        }
        self.state = ReactionState::Waiting { trial };
        ctx.emit(Frame::ReactionWaiting {
            trial,
            total: self.config.trials,
        });
        let delay = random_delay(&self.config, ctx.rng);
        ctx.timers.start(TimerKind::Deadline, Schedule::Once(delay));
    }

    fn show(&mut self, trial: u32, ctx: &mut TaskContext<'_>) {
        self.state = ReactionState::Stimulus {
            trial,
            shown_at: ctx.now,
        };
        ctx.emit(Frame::ReactionStimulus { trial });
        let hide = random_delay(&self.config, ctx.rng);
        ctx.timers.start(TimerKind::Deadline, Schedule::Once(hide));
    }
}

impl BatteryTask for ReactionTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Reaction
    }

    fn start(&mut self, ctx: &mut TaskContext<'_>) {
        self.outcome = ReactionOutcome::default();
        self.wait(1, ctx);
    }

    fn on_timer(&mut self, kind: TimerKind, ctx: &mut TaskContext<'_>) {
        if kind != TimerKind::Deadline {
            return;
        }
        match self.state {
            ReactionState::Waiting { trial } => self.show(trial, ctx),
            ReactionState::Stimulus { trial, .. } => {
                self.outcome.misses += 1;
                ctx.emit(Frame::ReactionMissed { trial });
                self.wait(trial + 1, ctx);
            }
            _ => {}
        }
    }

    fn on_input(&mut self, input: Input, ctx: &mut TaskContext<'_>) {
        if input != Input::Respond {
            return;
        }
        match self.state {
            ReactionState::Waiting { .. } => {
                self.outcome.anticipations += 1;
            }
            ReactionState::Stimulus { trial, shown_at } => {
                ctx.timers.cancel(TimerKind::Deadline);
                let latency_ms = ctx.now.saturating_duration_since(shown_at).as_millis() as u64;
                self.outcome.latencies_ms.push(latency_ms);
                ctx.emit(Frame::ReactionRecorded { trial, latency_ms });
                self.wait(trial + 1, ctx);
            }
            _ => {}
        }
    }

    fn outcome(&self) -> Option<TaskOutcome> {
        match self.state {
            ReactionState::Done => Some(TaskOutcome::Reaction(self.outcome.clone())),
            _ => None,
        }
    }
}
