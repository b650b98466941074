//! Submission error types.

use thiserror::Error;

/// Errors that can occur when posting results to the form endpoint.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The endpoint did not answer in time.
    #[error("submission timed out after {0}s")]
    Timeout(u64),

    /// The endpoint could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered with an error status.
    #[error("endpoint rejected submission (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}
