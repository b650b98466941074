//! Sorted digit-span task.
//!
//! Digits are shown one at a time; the participant must type them back in
//! ascending order. An adaptive ladder lengthens the sequence after a pass
//! and ends the task once every trial at a length has failed.

use std::time::Duration;

use rand::Rng;

use crate::config::DigitSpanConfig;
use crate::model::TaskKind;
use crate::observer::Frame;
use crate::results::{DigitSpanOutcome, DigitSpanTrial};
use crate::timer::{Schedule, TimerKind};

use super::{BatteryTask, Input, TaskContext, TaskOutcome};

/// Draw `len` digits from 1..=9 with replacement.
pub fn generate_sequence<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<u8> {
    (0..len).map(|_| rng.gen_range(1..=9)).collect()
}

/// The answer the participant must give: the presented digits, ascending.
pub fn expected_answer(presented: &[u8]) -> Vec<u8> {
    let mut sorted = presented.to_vec();
    sorted.sort_unstable();
    sorted
}

/// Parse a typed response. Whitespace is ignored; any other non-digit
/// character makes the response unparseable.
pub fn parse_response(input: &str) -> Option<Vec<u8>> {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect()
}

/// Returns `true` if `response` is the sorted form of `presented`.
pub fn score_response(presented: &[u8], response: &str) -> bool {
    parse_response(response).is_some_and(|digits| digits == expected_answer(presented))
}

/// What the ladder does after a scored trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderStep {
    /// Another trial at the same length.
    Retry,
    /// Move up one length.
    Advance,
    /// The task is over.
    Finished,
}

/// Adaptive length ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitSpanLadder {
    pub current_length: usize,
    pub trials_at_length: u32,
    pub failures_at_length: u32,
    pub best_length: usize,
    max_length: usize,
    trials_per_length: u32,
}

impl DigitSpanLadder {
    pub fn new(config: &DigitSpanConfig) -> Self {
        Self {
            current_length: config.start_length,
            trials_at_length: 0,
            failures_at_length: 0,
            best_length: 0,
            max_length: config.max_length,
            trials_per_length: config.trials_per_length.max(1),
        }
    }

    /// Record one trial at the current length.
    pub fn record(&mut self, passed: bool) -> LadderStep {
        self.trials_at_length += 1;
        if passed {
            self.best_length = self.best_length.max(self.current_length);
            if self.current_length >= self.max_length {
                return LadderStep::Finished;
            }
            self.current_length += 1;
            self.trials_at_length = 0;
            self.failures_at_length = 0;
            return LadderStep::Advance;
        }

        self.failures_at_length += 1;
        if self.failures_at_length >= self.trials_per_length {
            LadderStep::Finished
        } else {
            LadderStep::Retry
        }
    }
}

#[derive(Debug)]
enum DigitSpanState {
    Idle,
    Presenting {
        sequence: Vec<u8>,
        position: usize,
        showing: bool,
    },
    AwaitInput {
        sequence: Vec<u8>,
        /// What has been typed so far; submitted as-is when time runs out.
        entry: String,
    },
    Done,
}

pub struct DigitSpanTask {
    config: DigitSpanConfig,
    ladder: DigitSpanLadder,
    state: DigitSpanState,
    trials: Vec<DigitSpanTrial>,
}

impl DigitSpanTask {
    pub fn new(config: DigitSpanConfig) -> Self {
        let ladder = DigitSpanLadder::new(&config);
        Self {
            config,
            ladder,
            state: DigitSpanState::Idle,
            trials: Vec::new(),
        }
    }

    pub fn ladder(&self) -> &DigitSpanLadder {
        &self.ladder
    }

    pub fn is_awaiting_input(&self) -> bool {
        matches!(self.state, DigitSpanState::AwaitInput { .. })
    }

    /// The sequence of the trial in progress.
    pub fn current_sequence(&self) -> Option<&[u8]> {
        match &self.state {
            DigitSpanState::Presenting { sequence, .. }
            | DigitSpanState::AwaitInput { sequence, .. } => Some(sequence),
            _ => None,
        }
    }

    fn display(&self) -> Duration {
        Duration::from_millis(self.config.digit_display_ms)
    }

    fn begin_trial(&mut self, ctx: &mut TaskContext<'_>) {
        let sequence = generate_sequence(self.ladder.current_length, ctx.rng);
        if sequence.is_empty() {
            self.open_input(sequence, ctx);
            return;
        }
        ctx.emit(Frame::DigitShown {
            position: 0,
            length: sequence.len(),
            digit: sequence[0],
        });
        self.state = DigitSpanState::Presenting {
            sequence,
            position: 0,
            showing: true,
        };
        ctx.timers
            .start(TimerKind::Deadline, Schedule::Once(self.display()));
    }

    fn step_presentation(&mut self, ctx: &mut TaskContext<'_>) {
        let display = self.display();
        let gap = Duration::from_millis(self.config.digit_gap_ms);
        let DigitSpanState::Presenting {
            sequence,
            position,
            showing,
        } = &mut self.state
        else {
            return;
        };

        if *showing {
            ctx.emit(Frame::DigitHidden);
            if *position + 1 >= sequence.len() {
                let sequence = std::mem::take(sequence);
                self.open_input(sequence, ctx);
                return;
            }
            *showing = false;
            ctx.timers.start(TimerKind::Deadline, Schedule::Once(gap));
        } else {
            *position += 1;
            *showing = true;
            ctx.emit(Frame::DigitShown {
                position: *position,
                length: sequence.len(),
                digit: sequence[*position],
            });
            ctx.timers.start(TimerKind::Deadline, Schedule::Once(display));
        }
    }

    fn open_input(&mut self, sequence: Vec<u8>, ctx: &mut TaskContext<'_>) {
        ctx.emit(Frame::DigitInputOpen {
            length: sequence.len(),
            trial: self.ladder.trials_at_length + 1,
        });
        self.state = DigitSpanState::AwaitInput {
            sequence,
            entry: String::new(),
        };
        ctx.timers.start(
            TimerKind::Deadline,
            Schedule::Once(Duration::from_millis(self.config.input_timeout_ms)),
        );
    }

    fn submit(&mut self, response: Option<String>, ctx: &mut TaskContext<'_>) {
        let DigitSpanState::AwaitInput { sequence, entry } = &mut self.state else {
            return;
        };
        let presented = std::mem::take(sequence);
        let timed_out = response.is_none();
        let response = response.unwrap_or_else(|| std::mem::take(entry));
        let correct = score_response(&presented, &response);
        ctx.emit(Frame::DigitScored {
            length: presented.len(),
            correct,
            timed_out,
            expected: expected_answer(&presented),
        });
        self.trials.push(DigitSpanTrial {
            length: presented.len(),
            presented,
            response,
            correct,
            timed_out,
        });

        match self.ladder.record(correct) {
            LadderStep::Retry | LadderStep::Advance => self.begin_trial(ctx),
            LadderStep::Finished => {
                ctx.timers.cancel(TimerKind::Deadline);
                self.state = DigitSpanState::Done;
                tracing::debug!(best = self.ladder.best_length, "digit span finished");
                ctx.emit(Frame::TaskComplete {
                    task: TaskKind::DigitSpan,
                });
            }
        }
    }
}

impl BatteryTask for DigitSpanTask {
    fn kind(&self) -> TaskKind {
        TaskKind::DigitSpan
    }

    fn start(&mut self, ctx: &mut TaskContext<'_>) {
        self.ladder = DigitSpanLadder::new(&self.config);
        self.trials.clear();
        if self.ladder.current_length > self.config.max_length {
            self.state = DigitSpanState::Done;
            return;
        }
        self.begin_trial(ctx);
    }

    fn on_timer(&mut self, kind: TimerKind, ctx: &mut TaskContext<'_>) {
        if kind != TimerKind::Deadline {
            return;
        }
        match self.state {
            DigitSpanState::Presenting { .. } => self.step_presentation(ctx),
            DigitSpanState::AwaitInput { .. } => self.submit(None, ctx),
            _ => {}
        }
    }

    fn on_input(&mut self, input: Input, ctx: &mut TaskContext<'_>) {
        let DigitSpanState::AwaitInput { entry, .. } = &mut self.state else {
            return;
        };
        match input {
            Input::Entry(text) => *entry = text,
            Input::Text(text) => {
                ctx.timers.cancel(TimerKind::Deadline);
                self.submit(Some(text), ctx);
            }
            _ => {}
        }
    }

    fn outcome(&self) -> Option<TaskOutcome> {
        match self.state {
            DigitSpanState::Done => Some(TaskOutcome::DigitSpan(DigitSpanOutcome {
                best_length: self.ladder.best_length,
                trials: self.trials.clone(),
            })),
            _ => None,
        }
    }
}
