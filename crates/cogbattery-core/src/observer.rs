//! Presentation seam.
//!
//! The core never renders anything itself. It reports phase changes and
//! render-ready [`Frame`]s to a [`SessionObserver`], which a terminal, GUI, or
//! test harness implements.

use std::sync::Mutex;

use crate::error::SessionError;
use crate::model::{Color, TaskKind};
use crate::results::FinalResults;
use crate::session::Phase;
use crate::tasks::stroop::StroopPhase;

/// A render-ready snapshot of what the participant should see.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Tasks still to do, in hub order.
    Hub { remaining: Vec<TaskKind> },

    StudyPair {
        round: u32,
        index: usize,
        total: usize,
        cue: String,
        target: String,
        /// Fraction of the study list already shown, `index / total`.
        progress: f64,
    },
    RecallCue {
        round: u32,
        item: usize,
        total: usize,
        prompt: String,
    },
    RecallScored {
        round: u32,
        item: usize,
        correct: bool,
        timed_out: bool,
    },
    RoundComplete {
        round: u32,
        correct: u32,
        total: usize,
    },

    StroopTrial {
        phase: StroopPhase,
        word: Color,
        ink: Color,
    },
    StroopTick {
        phase: StroopPhase,
        seconds_left: u32,
    },
    StroopPhaseComplete {
        phase: StroopPhase,
        correct: u32,
    },

    DigitShown {
        position: usize,
        length: usize,
        digit: u8,
    },
    DigitHidden,
    DigitInputOpen {
        length: usize,
        trial: u32,
    },
    DigitScored {
        length: usize,
        correct: bool,
        timed_out: bool,
        expected: Vec<u8>,
    },

    ReactionWaiting { trial: u32, total: u32 },
    ReactionStimulus { trial: u32 },
    ReactionRecorded { trial: u32, latency_ms: u64 },
    ReactionMissed { trial: u32 },

    TaskComplete { task: TaskKind },
}

/// Receives state-change notifications from a session.
pub trait SessionObserver: Send + Sync {
    fn on_phase(&self, phase: Phase);
    fn on_frame(&self, frame: &Frame);
    fn on_rejected(&self, error: &SessionError);
    fn on_summary(&self, results: &FinalResults);
}

/// Observer that keeps everything it is told, for tests and replay.
#[derive(Default)]
pub struct RecordingObserver {
    phases: Mutex<Vec<Phase>>,
    frames: Mutex<Vec<Frame>>,
    rejections: Mutex<Vec<String>>,
    summaries: Mutex<Vec<FinalResults>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.phases.lock().unwrap().clone()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn rejections(&self) -> Vec<String> {
        self.rejections.lock().unwrap().clone()
    }

    pub fn summaries(&self) -> Vec<FinalResults> {
        self.summaries.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_phase(&self, phase: Phase) {
        self.phases.lock().unwrap().push(phase);
    }

    fn on_frame(&self, frame: &Frame) {
        self.frames.lock().unwrap().push(frame.clone());
    }

    fn on_rejected(&self, error: &SessionError) {
        self.rejections.lock().unwrap().push(error.to_string());
    }

    fn on_summary(&self, results: &FinalResults) {
        self.summaries.lock().unwrap().push(results.clone());
    }
}
