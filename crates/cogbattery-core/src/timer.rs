//! Cancellable task timers.
//!
//! A session owns exactly two timer slots: a repeating [`TimerKind::Ticker`]
//! and a single-shot [`TimerKind::Deadline`]. Arming a slot replaces whatever
//! it held. Every arming gets a fresh id, and an expiration is only delivered
//! to a task if its id is still the one armed in that slot, so an expiration
//! that was already in flight when its timer was replaced is dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// The two timer slots available to the active task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Repeating timer (study dwell, Stroop countdown).
    Ticker,
    /// Single-shot timer (answer window, presentation step, trial delay).
    Deadline,
}

impl TimerKind {
    fn slot(self) -> usize {
        match self {
            TimerKind::Ticker => 0,
            TimerKind::Deadline => 1,
        }
    }
}

/// When a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fire once after the duration.
    Once(Duration),
    /// Fire every period, first after one period.
    Every(Duration),
}

/// An expiration token delivered back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub id: u64,
}

/// Scheduling backend used by tasks.
pub trait TimerService: Send {
    /// Arm `kind` with `schedule`, cancelling any timer already in that slot.
    fn start(&mut self, kind: TimerKind, schedule: Schedule) -> TimerFired;

    /// Cancel the timer in slot `kind`. No-op if nothing is armed.
    fn cancel(&mut self, kind: TimerKind);

    /// Decide whether an expiration should reach the task.
    ///
    /// Returns `false` for expirations of replaced or cancelled timers. A
    /// single-shot timer is disarmed once accepted.
    fn accept(&mut self, fired: TimerFired) -> bool;

    /// Returns `true` if slot `kind` is armed.
    fn is_armed(&self, kind: TimerKind) -> bool;

    fn cancel_all(&mut self) {
        self.cancel(TimerKind::Ticker);
        self.cancel(TimerKind::Deadline);
    }
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    id: u64,
    repeating: bool,
}

/// Slot bookkeeping shared by the timer backends.
#[derive(Debug, Default)]
struct Slots {
    next_id: u64,
    armed: [Option<Armed>; 2],
}

impl Slots {
    fn arm(&mut self, kind: TimerKind, schedule: Schedule) -> TimerFired {
        self.next_id += 1;
        self.armed[kind.slot()] = Some(Armed {
            id: self.next_id,
            repeating: matches!(schedule, Schedule::Every(_)),
        });
        TimerFired {
            kind,
            id: self.next_id,
        }
    }

    fn disarm(&mut self, kind: TimerKind) -> bool {
        self.armed[kind.slot()].take().is_some()
    }

    fn accept(&mut self, fired: TimerFired) -> bool {
        let slot = &mut self.armed[fired.kind.slot()];
        match *slot {
            Some(armed) if armed.id == fired.id => {
                if !armed.repeating {
                    *slot = None;
                }
                true
            }
            _ => false,
        }
    }

    fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed[kind.slot()].is_some()
    }
}

/// Timer backend that runs on the tokio clock.
///
/// Each armed timer is a spawned task posting [`TimerFired`] into the
/// channel handed to [`TokioTimers::new`]; replacing or cancelling a timer
/// aborts its task.
pub struct TokioTimers {
    slots: Slots,
    handles: [Option<AbortHandle>; 2],
    tx: mpsc::UnboundedSender<TimerFired>,
}

impl TokioTimers {
    pub fn new(tx: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            slots: Slots::default(),
            handles: [None, None],
            tx,
        }
    }

    /// Create a backend together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn abort(&mut self, kind: TimerKind) {
        if let Some(handle) = self.handles[kind.slot()].take() {
            handle.abort();
        }
    }
}

impl TimerService for TokioTimers {
    fn start(&mut self, kind: TimerKind, schedule: Schedule) -> TimerFired {
        self.abort(kind);
        let fired = self.slots.arm(kind, schedule);
        let tx = self.tx.clone();

        let handle = match schedule {
            Schedule::Once(after) => tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let _ = tx.send(fired);
            }),
            Schedule::Every(period) => tokio::spawn(async move {
                let start = tokio::time::Instant::now() + period;
                let mut interval = tokio::time::interval_at(start, period);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    if tx.send(fired).is_err() {
                        break;
                    }
                }
            }),
        };
        self.handles[kind.slot()] = Some(handle.abort_handle());
        fired
    }

    fn cancel(&mut self, kind: TimerKind) {
        self.abort(kind);
        self.slots.disarm(kind);
    }

    fn accept(&mut self, fired: TimerFired) -> bool {
        let accepted = self.slots.accept(fired);
        if accepted && !self.slots.is_armed(fired.kind) {
            self.handles[fired.kind.slot()] = None;
        }
        accepted
    }

    fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots.is_armed(kind)
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        self.abort(TimerKind::Ticker);
        self.abort(TimerKind::Deadline);
    }
}

/// Timer backend that never fires by itself.
///
/// Tests and step-by-step drivers call [`ManualTimers::fire`] to obtain the
/// expiration token of an armed slot and hand it to the session.
#[derive(Debug, Default)]
pub struct ManualTimers {
    slots: Slots,
    schedules: [Option<(TimerFired, Schedule)>; 2],
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The schedule currently armed in slot `kind`.
    pub fn scheduled(&self, kind: TimerKind) -> Option<Schedule> {
        if !self.slots.is_armed(kind) {
            return None;
        }
        self.schedules[kind.slot()].map(|(_, schedule)| schedule)
    }

    /// Expiration token for slot `kind`, if armed.
    pub fn fire(&self, kind: TimerKind) -> Option<TimerFired> {
        if !self.slots.is_armed(kind) {
            return None;
        }
        self.schedules[kind.slot()].map(|(fired, _)| fired)
    }
}

impl TimerService for ManualTimers {
    fn start(&mut self, kind: TimerKind, schedule: Schedule) -> TimerFired {
        let fired = self.slots.arm(kind, schedule);
        self.schedules[kind.slot()] = Some((fired, schedule));
        fired
    }

    fn cancel(&mut self, kind: TimerKind) {
        self.slots.disarm(kind);
        self.schedules[kind.slot()] = None;
    }

    fn accept(&mut self, fired: TimerFired) -> bool {
        self.slots.accept(fired)
    }

    fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots.is_armed(kind)
    }
}
