//! Result submission to a form endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::instrument;

use cogbattery_core::results::FinalResults;
use cogbattery_core::sink::ResultSink;

use crate::error::SubmitError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Posts results as `application/x-www-form-urlencoded` fields.
///
/// As a [`ResultSink`] it spawns the request and returns at once; failures
/// are logged and never retried. Call [`FormSubmitter::flush`] before the
/// runtime shuts down to let in-flight posts finish.
#[derive(Clone)]
pub struct FormSubmitter {
    endpoint: String,
    client: reqwest::Client,
    timeout_secs: u64,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl FormSubmitter {
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(endpoint: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
            timeout_secs,
            in_flight: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post `results` once and report the outcome.
    #[instrument(skip(self, results), fields(participant = %results.participant_id, week = results.week))]
    pub async fn post(&self, results: &FinalResults) -> Result<(), SubmitError> {
        let fields = results.form_fields();
        let response = self
            .client
            .post(&self.endpoint)
            .form(&fields)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmitError::Timeout(self.timeout_secs)
                } else {
                    SubmitError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected { status, message });
        }
        tracing::info!(status, "results submitted");
        Ok(())
    }

    /// Wait for every spawned submission to finish.
    pub async fn flush(&self) {
        let pending: Vec<JoinHandle<()>> = match self.in_flight.lock() {
            Ok(mut in_flight) => in_flight.drain(..).collect(),
            Err(_) => return,
        };
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "submission task failed");
            }
        }
    }
}

impl ResultSink for FormSubmitter {
    fn submit(&self, results: &FinalResults) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime, results not submitted");
            return;
        };
        let submitter = self.clone();
        let results = results.clone();
        let handle = runtime.spawn(async move {
            if let Err(e) = submitter.post(&results).await {
                tracing::warn!(error = %e, endpoint = %submitter.endpoint, "result submission failed");
            }
        });
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.push(handle);
        }
    }
}
