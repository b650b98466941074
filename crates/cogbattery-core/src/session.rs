//! Session controller.
//!
//! Owns the one mutable [`Session`] of a run and sequences it through
//! setup, the hub, the four tasks, and the summary. Every event (a
//! participant command or a timer expiration) is handled to completion
//! before the next one.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::time::Instant;
use uuid::Uuid;

use crate::assignment::select_wordset;
use crate::config::BatteryConfig;
use crate::error::SessionError;
use crate::lock::{advance_lock, read_lock, LockState, LockStore};
use crate::model::{wordset, Pair, TaskKind};
use crate::observer::{Frame, SessionObserver};
use crate::results::{DigitSpanOutcome, FinalResults, MemoryOutcome, ReactionOutcome, StroopOutcome};
use crate::runner::SessionCommand;
use crate::sink::ResultSink;
use crate::tasks::{new_task, BatteryTask, Input, TaskContext, TaskOutcome};
use crate::timer::{TimerFired, TimerService, TokioTimers};

/// Top-level phase of a session. Exactly one is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    /// A `started` marker exists for the requested week.
    ConfirmRestart,
    Hub,
    Task(TaskKind),
    Summary,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::ConfirmRestart => write!(f, "restart confirmation"),
            Phase::Hub => write!(f, "the hub"),
            Phase::Task(kind) => write!(f, "the {kind} task"),
            Phase::Summary => write!(f, "the summary"),
        }
    }
}

/// Result of a successful setup submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    /// The session started and the hub is showing.
    Ready,
    /// An unfinished attempt exists; waiting for `confirm_restart`.
    NeedsRestartConfirmation,
}

/// Validate a participant ID: digits only after trimming.
pub fn validate_participant_id(input: &str) -> Result<String, SessionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(SessionError::InvalidParticipantId(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Validate a week number against `max_week` (`None` means no upper bound).
pub fn validate_week(input: &str, max_week: Option<u32>) -> Result<u32, SessionError> {
    let trimmed = input.trim();
    let invalid = || SessionError::InvalidWeek {
        input: trimmed.to_string(),
        max_week,
    };
    let week: u32 = trimmed.parse().map_err(|_| invalid())?;
    if week < 1 || max_week.is_some_and(|max| week > max) {
        return Err(invalid());
    }
    Ok(week)
}

/// State of one participant's run through the battery.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub participant_id: String,
    pub week: u32,
    pub wordset_index: usize,
    /// The wordset in its fixed order. The memory task shuffles per round.
    pub pairs: Vec<Pair>,
    pub started_at: DateTime<Utc>,
    pub memory: Option<MemoryOutcome>,
    pub stroop: Option<StroopOutcome>,
    pub digit_span: Option<DigitSpanOutcome>,
    pub reaction: Option<ReactionOutcome>,
}

impl Session {
    fn new(participant_id: String, week: u32) -> Self {
        let wordset_index = select_wordset(i64::from(week));
        Self {
            id: Uuid::new_v4(),
            participant_id,
            week,
            wordset_index,
            pairs: wordset(wordset_index),
            started_at: Utc::now(),
            memory: None,
            stroop: None,
            digit_span: None,
            reaction: None,
        }
    }

    pub fn is_completed(&self, kind: TaskKind) -> bool {
        match kind {
            TaskKind::Memory => self.memory.is_some(),
            TaskKind::Stroop => self.stroop.is_some(),
            TaskKind::DigitSpan => self.digit_span.is_some(),
            TaskKind::Reaction => self.reaction.is_some(),
        }
    }

    /// Tasks not yet completed, in hub order.
    pub fn remaining(&self) -> Vec<TaskKind> {
        TaskKind::ALL
            .into_iter()
            .filter(|kind| !self.is_completed(*kind))
            .collect()
    }

    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Memory(o) => self.memory = Some(o),
            TaskOutcome::Stroop(o) => self.stroop = Some(o),
            TaskOutcome::DigitSpan(o) => self.digit_span = Some(o),
            TaskOutcome::Reaction(o) => self.reaction = Some(o),
        }
    }

    /// Aggregate the four outcomes. `None` until every task is done.
    pub fn finish(&self, completed_at: DateTime<Utc>) -> Option<FinalResults> {
        let reaction = self.reaction.clone()?;
        Some(FinalResults {
            session_id: self.id,
            participant_id: self.participant_id.clone(),
            week: self.week,
            wordset_index: self.wordset_index,
            memory: self.memory.clone()?,
            stroop: self.stroop?,
            digit_span: self.digit_span.clone()?,
            reaction_mean_ms: reaction.mean_ms(),
            reaction,
            completed_at,
        })
    }
}

#[derive(Debug, Clone)]
struct PendingSetup {
    participant_id: String,
    week: u32,
}

/// Drives a session from setup to summary.
pub struct SessionController<T: TimerService = TokioTimers> {
    config: BatteryConfig,
    phase: Phase,
    session: Option<Session>,
    pending: Option<PendingSetup>,
    active: Option<Box<dyn BatteryTask>>,
    final_results: Option<FinalResults>,
    timers: T,
    rng: Box<dyn RngCore + Send>,
    locks: Arc<dyn LockStore>,
    sink: Arc<dyn ResultSink>,
    observer: Arc<dyn SessionObserver>,
}

impl<T: TimerService> SessionController<T> {
    pub fn new(
        config: BatteryConfig,
        timers: T,
        locks: Arc<dyn LockStore>,
        sink: Arc<dyn ResultSink>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            config,
            phase: Phase::Setup,
            session: None,
            pending: None,
            active: None,
            final_results: None,
            timers,
            rng: Box::new(StdRng::from_entropy()),
            locks,
            sink,
            observer,
        }
    }

    /// Replace the entropy-seeded generator, e.g. with a seeded one in tests.
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn final_results(&self) -> Option<&FinalResults> {
        self.final_results.as_ref()
    }

    pub fn remaining_tasks(&self) -> Vec<TaskKind> {
        self.session
            .as_ref()
            .map(Session::remaining)
            .unwrap_or_default()
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    /// Dispatch a command to the matching operation.
    pub fn apply(&mut self, command: SessionCommand, now: Instant) -> Result<(), SessionError> {
        match command {
            SessionCommand::Setup { participant_id, week } => {
                self.setup(&participant_id, &week).map(|_| ())
            }
            SessionCommand::ConfirmRestart(confirm) => self.confirm_restart(confirm),
            SessionCommand::ChooseTask(kind) => self.choose_task(kind, now),
            SessionCommand::Input(input) => {
                self.handle_input(input, now);
                Ok(())
            }
            SessionCommand::ReturnToHub => self.return_to_hub(),
            SessionCommand::Restart => {
                self.restart();
                Ok(())
            }
        }
    }

    /// Validate setup input and check the completion lock.
    pub fn setup(&mut self, participant_id: &str, week: &str) -> Result<SetupOutcome, SessionError> {
        self.require(Phase::Setup, "submit setup")?;
        let participant_id = validate_participant_id(participant_id)?;
        let week = validate_week(week, self.config.setup.max_week)?;

        match read_lock(self.locks.as_ref(), &participant_id, week)? {
            Some(LockState::Completed) => Err(SessionError::AlreadyCompleted {
                participant_id,
                week,
            }),
            Some(LockState::Started) => {
                tracing::debug!(%participant_id, week, "unfinished attempt found");
                self.pending = Some(PendingSetup {
                    participant_id,
                    week,
                });
                self.set_phase(Phase::ConfirmRestart);
                Ok(SetupOutcome::NeedsRestartConfirmation)
            }
            None => {
                self.begin_session(participant_id, week)?;
                Ok(SetupOutcome::Ready)
            }
        }
    }

    /// Answer the restart question: start from scratch, or go back to setup.
    pub fn confirm_restart(&mut self, confirm: bool) -> Result<(), SessionError> {
        self.require(Phase::ConfirmRestart, "confirm a restart")?;
        let Some(pending) = self.pending.take() else {
            self.set_phase(Phase::Setup);
            return Ok(());
        };
        if confirm {
            self.begin_session(pending.participant_id, pending.week)
        } else {
            self.set_phase(Phase::Setup);
            Ok(())
        }
    }

    /// Start a task from the hub. Its state is always fresh.
    pub fn choose_task(&mut self, kind: TaskKind, now: Instant) -> Result<(), SessionError> {
        self.require(Phase::Hub, "choose a task")?;
        let session = self.session.as_ref().ok_or(SessionError::InvalidTransition {
            action: "choose a task",
            phase: self.phase,
        })?;
        if session.is_completed(kind) {
            return Err(SessionError::TaskAlreadyCompleted(kind));
        }

        self.active = Some(new_task(kind, &self.config, &session.pairs));
        self.set_phase(Phase::Task(kind));
        self.drive(now, |task, ctx| task.start(ctx));
        self.collect_outcome()
    }

    /// Route a participant action to the active task. Ignored when no task
    /// is running.
    pub fn handle_input(&mut self, input: Input, now: Instant) {
        if self.active.is_none() {
            tracing::debug!(?input, phase = %self.phase, "input ignored, no active task");
            return;
        }
        self.drive(now, |task, ctx| task.on_input(input, ctx));
        if let Err(e) = self.collect_outcome() {
            self.observer.on_rejected(&e);
        }
    }

    /// Deliver a timer expiration. Stale expirations are dropped.
    pub fn handle_timer(&mut self, fired: TimerFired, now: Instant) {
        if !self.timers.accept(fired) {
            tracing::debug!(?fired, "stale timer dropped");
            return;
        }
        if self.active.is_none() {
            tracing::debug!(?fired, phase = %self.phase, "timer without active task");
            return;
        }
        self.drive(now, |task, ctx| task.on_timer(fired.kind, ctx));
        if let Err(e) = self.collect_outcome() {
            self.observer.on_rejected(&e);
        }
    }

    /// Abandon the active task. Re-entering it later starts over.
    pub fn return_to_hub(&mut self) -> Result<(), SessionError> {
        let Phase::Task(kind) = self.phase else {
            return Err(SessionError::InvalidTransition {
                action: "return to the hub",
                phase: self.phase,
            });
        };
        tracing::debug!(%kind, "task abandoned");
        self.timers.cancel_all();
        self.active = None;
        self.enter_hub();
        Ok(())
    }

    /// Discard the session and go back to setup. The completion lock is
    /// left as it is.
    pub fn restart(&mut self) {
        self.timers.cancel_all();
        self.active = None;
        self.session = None;
        self.pending = None;
        self.final_results = None;
        self.set_phase(Phase::Setup);
    }

    fn require(&self, phase: Phase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::debug!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
        self.observer.on_phase(phase);
    }

    fn enter_hub(&mut self) {
        self.set_phase(Phase::Hub);
        self.observer.on_frame(&Frame::Hub {
            remaining: self.remaining_tasks(),
        });
    }

    fn begin_session(&mut self, participant_id: String, week: u32) -> Result<(), SessionError> {
        advance_lock(self.locks.as_ref(), &participant_id, week, LockState::Started)?;
        let session = Session::new(participant_id, week);
        tracing::info!(
            session_id = %session.id,
            participant_id = %session.participant_id,
            week,
            wordset = session.wordset_index,
            "session started"
        );
        self.session = Some(session);
        self.final_results = None;
        self.enter_hub();
        Ok(())
    }

    fn drive(&mut self, now: Instant, f: impl FnOnce(&mut dyn BatteryTask, &mut TaskContext<'_>)) {
        let Some(task) = self.active.as_mut() else {
            return;
        };
        let mut ctx = TaskContext {
            timers: &mut self.timers,
            rng: self.rng.as_mut(),
            observer: self.observer.as_ref(),
            now,
        };
        f(task.as_mut(), &mut ctx);
    }

    fn collect_outcome(&mut self) -> Result<(), SessionError> {
        let Some(outcome) = self.active.as_ref().and_then(|task| task.outcome()) else {
            return Ok(());
        };
        self.timers.cancel_all();
        self.active = None;
        tracing::debug!(task = %outcome.kind(), "task completed");

        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.record(outcome);
        if session.remaining().is_empty() {
            self.complete_session()
        } else {
            self.enter_hub();
            Ok(())
        }
    }

    fn complete_session(&mut self) -> Result<(), SessionError> {
        let Some(results) = self.session.as_ref().and_then(|s| s.finish(Utc::now())) else {
            return Ok(());
        };
        let locked = advance_lock(
            self.locks.as_ref(),
            &results.participant_id,
            results.week,
            LockState::Completed,
        );
        if let Err(e) = &locked {
            tracing::error!(error = %format!("{e:#}"), "failed to mark session completed");
        }

        tracing::info!(
            session_id = %results.session_id,
            participant_id = %results.participant_id,
            week = results.week,
            "session complete"
        );
        self.sink.submit(&results);
        self.set_phase(Phase::Summary);
        self.observer.on_summary(&results);
        self.final_results = Some(results);
        locked.map_err(SessionError::from)
    }
}
