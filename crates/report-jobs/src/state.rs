//! Client-side report state and its transitions
//!
//! [`ReportState`] is a plain value. Every change goes through one of the
//! `apply_*` transitions, which consume the old state and return the new one,
//! so they can be tested without a runtime and applied atomically inside
//! `watch::Sender::send_modify`.

use crate::handle::JobHandle;
use crate::poller::{JobCompletion, PollFailure};
use report_core::{JobKind, JobStatusSnapshot, Merge, ReportPatch, ReportResult};
use tracing::debug;

/// Progress of the most recent job of one kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobTrack {
    /// Handle of the most recent job, if any was launched
    pub handle: Option<JobHandle>,
    /// Latest status observed
    pub snapshot: Option<JobStatusSnapshot>,
    /// Error text of the last failure
    pub error: Option<String>,
    /// Whether the job is still being tracked
    pub running: bool,
}

impl JobTrack {
    /// One-line progress description for display
    pub fn progress_line(&self) -> Option<String> {
        self.snapshot.as_ref().map(JobStatusSnapshot::progress_line)
    }
}

/// Everything the presentation layer shows about reports
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportState {
    /// Current report; replaced wholesale by each new report completion
    pub report: Option<ReportResult>,
    pub report_job: JobTrack,
    pub analysis_job: JobTrack,
    /// Coverage degradation message of the latest report run
    pub warning: Option<String>,
}

impl ReportState {
    pub fn track(&self, kind: JobKind) -> &JobTrack {
        match kind {
            JobKind::Report => &self.report_job,
            JobKind::Analysis => &self.analysis_job,
        }
    }

    fn track_mut(&mut self, kind: JobKind) -> &mut JobTrack {
        match kind {
            JobKind::Report => &mut self.report_job,
            JobKind::Analysis => &mut self.analysis_job,
        }
    }

    /// A job was launched; clears that kind's previous error
    pub fn apply_launch(mut self, handle: JobHandle, snapshot: JobStatusSnapshot) -> Self {
        let track = self.track_mut(handle.kind());
        *track = JobTrack {
            handle: Some(handle),
            snapshot: Some(snapshot),
            error: None,
            running: true,
        };
        self
    }

    /// A synchronous run started; there is no handle to track
    pub fn apply_sync_start(mut self, kind: JobKind) -> Self {
        *self.track_mut(kind) = JobTrack {
            running: true,
            ..JobTrack::default()
        };
        self
    }

    /// Record a progress observation
    pub fn apply_update(mut self, kind: JobKind, snapshot: JobStatusSnapshot) -> Self {
        self.track_mut(kind).snapshot = Some(snapshot);
        self
    }

    /// Store a finished job's result.
    ///
    /// A report replaces the current one. An analysis is merged into the
    /// current report only when the report ids match; otherwise it is dropped.
    pub fn apply_complete(mut self, completion: JobCompletion) -> Self {
        let kind = completion.kind();
        match completion {
            JobCompletion::Report(report) => {
                self.report = Some(report);
            }
            JobCompletion::Analysis(analysis) => {
                self.report = match self.report.take() {
                    Some(report) if report.id == analysis.report_id => {
                        Some(report.merge(ReportPatch::from(analysis)))
                    }
                    other => {
                        debug!(
                            "Dropping analysis of report {}: not the current report",
                            analysis.report_id
                        );
                        other
                    }
                };
            }
        }

        let track = self.track_mut(kind);
        track.running = false;
        track.error = None;
        self
    }

    /// Record a polling failure on that kind's track only
    pub fn apply_fail(self, kind: JobKind, failure: &PollFailure) -> Self {
        self.apply_error(kind, failure.to_string())
    }

    /// Record an error message on that kind's track only
    pub fn apply_error(mut self, kind: JobKind, message: String) -> Self {
        let track = self.track_mut(kind);
        track.running = false;
        track.error = Some(message);
        self
    }

    /// Record an error on that kind's track while its job keeps running
    pub fn apply_side_error(mut self, kind: JobKind, message: String) -> Self {
        self.track_mut(kind).error = Some(message);
        self
    }

    /// Stop tracking the job of one kind; results and errors are kept
    pub fn apply_cancel_kind(mut self, kind: JobKind) -> Self {
        self.track_mut(kind).running = false;
        self
    }

    /// Set or clear the coverage degradation message
    pub fn apply_warning(mut self, message: Option<String>) -> Self {
        self.warning = message;
        self
    }

    /// Stop tracking every job; results and errors are kept
    pub fn apply_cancel(mut self) -> Self {
        self.report_job.running = false;
        self.analysis_job.running = false;
        self
    }
}
