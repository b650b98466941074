//! Async driver for a session.
//!
//! [`BatteryRunner`] owns a [`SessionController`] backed by tokio timers and
//! multiplexes participant commands with timer expirations, one event at a
//! time.

use std::sync::Arc;

use rand::RngCore;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::BatteryConfig;
use crate::lock::LockStore;
use crate::model::TaskKind;
use crate::observer::SessionObserver;
use crate::results::FinalResults;
use crate::session::{Phase, SessionController};
use crate::sink::ResultSink;
use crate::tasks::Input;
use crate::timer::{TimerFired, TokioTimers};

/// A participant command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Setup { participant_id: String, week: String },
    ConfirmRestart(bool),
    ChooseTask(TaskKind),
    Input(Input),
    ReturnToHub,
    Restart,
}

pub struct BatteryRunner {
    controller: SessionController<TokioTimers>,
    fired: mpsc::UnboundedReceiver<TimerFired>,
    observer: Arc<dyn SessionObserver>,
}

impl BatteryRunner {
    pub fn new(
        config: BatteryConfig,
        locks: Arc<dyn LockStore>,
        sink: Arc<dyn ResultSink>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let (timers, fired) = TokioTimers::channel();
        let controller = SessionController::new(config, timers, locks, sink, observer.clone());
        Self {
            controller,
            fired,
            observer,
        }
    }

    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.controller = self.controller.with_rng(rng);
        self
    }

    pub fn controller(&self) -> &SessionController<TokioTimers> {
        &self.controller
    }

    /// Process events until the summary is reached.
    ///
    /// Returns `None` if `commands` closes first. Rejected commands are
    /// reported to the observer and do not stop the loop.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
    ) -> Option<FinalResults> {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!(phase = %self.controller.phase(), "command channel closed");
                        return None;
                    };
                    if let Err(e) = self.controller.apply(command, Instant::now()) {
                        tracing::debug!(error = %e, "command rejected");
                        self.observer.on_rejected(&e);
                    }
                }
                Some(fired) = self.fired.recv() => {
                    self.controller.handle_timer(fired, Instant::now());
                }
            }

            if self.controller.phase() == Phase::Summary {
                return self.controller.final_results().cloned();
            }
        }
    }
}
