//! Result submission seam.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::results::FinalResults;

/// Destination for a completed session's results.
///
/// Submission is fire-and-forget: implementations report their own failures
/// and never block the session.
pub trait ResultSink: Send + Sync {
    fn submit(&self, results: &FinalResults);
}

/// Sink that discards results.
pub struct NoopSink;

impl ResultSink for NoopSink {
    fn submit(&self, _results: &FinalResults) {}
}

/// Sink that keeps every submission in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    submitted: Mutex<Vec<FinalResults>>,
    count: AtomicU32,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of submissions received.
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<FinalResults> {
        self.submitted.lock().unwrap().clone()
    }
}

impl ResultSink for RecordingSink {
    fn submit(&self, results: &FinalResults) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(results.clone());
    }
}
