//! Stroop color-naming task.
//!
//! Two timed phases. A response is scored against the ink color, never the
//! word, and every response immediately brings up the next trial.

use std::fmt;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::StroopConfig;
use crate::model::{Color, TaskKind};
use crate::observer::Frame;
use crate::results::{StroopOutcome, StroopPhaseResult};
use crate::timer::{Schedule, TimerKind};

use super::{BatteryTask, Input, TaskContext, TaskOutcome};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StroopPhase {
    Congruent,
    Incongruent,
}

impl fmt::Display for StroopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StroopPhase::Congruent => write!(f, "congruent"),
            StroopPhase::Incongruent => write!(f, "incongruent"),
        }
    }
}

/// A color word and the ink it is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StroopTrial {
    pub word: Color,
    pub ink: Color,
}

impl StroopTrial {
    pub fn is_correct(&self, response: Color) -> bool {
        response == self.ink
    }
}

/// Draw a trial for `phase`.
///
/// Congruent trials use the word's own color as ink; incongruent trials
/// draw the ink uniformly from the other three colors.
pub fn generate_trial<R: Rng + ?Sized>(phase: StroopPhase, rng: &mut R) -> StroopTrial {
    let word = Color::ALL[rng.gen_range(0..Color::ALL.len())];
    let ink = match phase {
        StroopPhase::Congruent => word,
        StroopPhase::Incongruent => {
            let others: Vec<Color> = Color::ALL.into_iter().filter(|c| *c != word).collect();
            others[rng.gen_range(0..others.len())]
        }
    };
    StroopTrial { word, ink }
}

#[derive(Debug)]
enum StroopState {
    Idle,
    Running {
        phase: StroopPhase,
        seconds_left: u32,
        trial: StroopTrial,
        result: StroopPhaseResult,
    },
    Done,
}

pub struct StroopTask {
    config: StroopConfig,
    state: StroopState,
    outcome: StroopOutcome,
}

impl StroopTask {
    pub fn new(config: StroopConfig) -> Self {
        Self {
            config,
            state: StroopState::Idle,
            outcome: StroopOutcome::default(),
        }
    }

    pub fn phase(&self) -> Option<StroopPhase> {
        match self.state {
            StroopState::Running { phase, .. } => Some(phase),
            _ => None,
        }
    }

    pub fn current_trial(&self) -> Option<StroopTrial> {
        match self.state {
            StroopState::Running { trial, .. } => Some(trial),
            _ => None,
        }
    }

    fn begin_phase(&mut self, phase: StroopPhase, ctx: &mut TaskContext<'_>) {
        let trial = generate_trial(phase, ctx.rng);
        self.state = StroopState::Running {
            phase,
            seconds_left: self.config.phase_secs,
            trial,
            result: StroopPhaseResult::default(),
        };
        tracing::debug!(%phase, "stroop phase started");
        ctx.emit(Frame::StroopTick {
            phase,
            seconds_left: self.config.phase_secs,
        });
        ctx.emit(Frame::StroopTrial {
            phase,
            word: trial.word,
            ink: trial.ink,
        });
        ctx.timers.start(TimerKind::Ticker, Schedule::Every(TICK));
    }

    fn tick(&mut self, ctx: &mut TaskContext<'_>) {
        let StroopState::Running {
            phase,
            seconds_left,
            result,
            ..
        } = &mut self.state
        else {
            return;
        };
        *seconds_left = seconds_left.saturating_sub(1);
        ctx.emit(Frame::StroopTick {
            phase: *phase,
            seconds_left: *seconds_left,
        });
        if *seconds_left > 0 {
            return;
        }

        let (phase, result) = (*phase, *result);
        ctx.timers.cancel(TimerKind::Ticker);
        ctx.emit(Frame::StroopPhaseComplete {
            phase,
            correct: result.correct,
        });
        match phase {
            StroopPhase::Congruent => {
                self.outcome.congruent = result;
                self.begin_phase(StroopPhase::Incongruent, ctx);
            }
            StroopPhase::Incongruent => {
                self.outcome.incongruent = result;
                self.state = StroopState::Done;
                ctx.emit(Frame::TaskComplete {
                    task: TaskKind::Stroop,
                });
            }
        }
    }

    fn respond(&mut self, response: Color, ctx: &mut TaskContext<'_>) {
        let StroopState::Running {
            phase,
            trial,
            result,
            ..
        } = &mut self.state
        else {
            return;
        };
        result.responses += 1;
        if trial.is_correct(response) {
            result.correct += 1;
        }
        *trial = generate_trial(*phase, ctx.rng);
        ctx.emit(Frame::StroopTrial {
            phase: *phase,
            word: trial.word,
            ink: trial.ink,
        });
    }
}

impl BatteryTask for StroopTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Stroop
    }

    fn start(&mut self, ctx: &mut TaskContext<'_>) {
        self.outcome = StroopOutcome::default();
        self.begin_phase(StroopPhase::Congruent, ctx);
    }

    fn on_timer(&mut self, kind: TimerKind, ctx: &mut TaskContext<'_>) {
        if kind == TimerKind::Ticker {
            self.tick(ctx);
        }
    }

    fn on_input(&mut self, input: Input, ctx: &mut TaskContext<'_>) {
        if let Input::Color(color) = input {
            self.respond(color, ctx);
        }
    }

    fn outcome(&self) -> Option<TaskOutcome> {
        match self.state {
            StroopState::Done => Some(TaskOutcome::Stroop(self.outcome)),
            _ => None,
        }
    }
}
