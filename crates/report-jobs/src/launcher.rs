//! Job launching
//!
//! The launcher validates a request, makes exactly one bounded launch call
//! and turns the backend's acknowledgement into a [`JobHandle`]. It never
//! retries: a failed launch is reported to the caller and nothing is tracked.

use crate::deadline::within;
use crate::handle::JobHandle;
use report_client::{JobAccepted, ReportBackend};
use report_core::{Error, JobKind, JobRequest, JobStatusSnapshot, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A job the backend accepted, with the status it reported at launch
#[derive(Debug, Clone, PartialEq)]
pub struct Launched {
    pub handle: JobHandle,
    pub snapshot: JobStatusSnapshot,
}

/// Starts report and analysis jobs
pub struct JobLauncher {
    backend: Arc<dyn ReportBackend>,
    timeout: Duration,
}

impl JobLauncher {
    /// Create a launcher whose calls are bounded by `timeout`
    pub fn new(backend: Arc<dyn ReportBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Launch a report job
    pub async fn launch_report(&self, request: &JobRequest) -> Result<Launched> {
        request.validate()?;

        let accepted = within(
            "launch_report_job",
            self.timeout,
            self.backend.launch_report_job(request),
        )
        .await
        .inspect_err(|e| warn!("Report launch failed: {}", e))?;

        Self::accept(JobKind::Report, accepted)
    }

    /// Launch an AI narrative job for `report_id`
    pub async fn launch_analysis(
        &self,
        report_id: &str,
        api_key: &str,
        refresh: bool,
    ) -> Result<Launched> {
        if report_id.trim().is_empty() {
            return Err(Error::Validation("report id must not be empty".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(Error::Validation("analysis API key is required".to_string()));
        }

        let accepted = within(
            "launch_analysis_job",
            self.timeout,
            self.backend.launch_analysis_job(report_id, api_key, refresh),
        )
        .await
        .inspect_err(|e| warn!("Analysis launch failed for {}: {}", report_id, e))?;

        Self::accept(JobKind::Analysis, accepted)
    }

    fn accept(kind: JobKind, accepted: JobAccepted) -> Result<Launched> {
        if accepted.job_id.trim().is_empty() {
            return Err(Error::Generic(format!(
                "backend accepted the {kind} job without an id"
            )));
        }

        let handle = JobHandle::new(accepted.job_id, kind);
        info!(
            "Launched {} ({})",
            handle,
            accepted.snapshot.progress_line()
        );

        Ok(Launched {
            handle,
            snapshot: accepted.snapshot,
        })
    }
}
