//! Non-blocking job status polling
//!
//! A [`StatusPoller`] tracks one launched job:
//!
//! ```text
//! Idle --start--> Polling --completed--> Completed
//!                    |----failed-------> Failed
//!                    `----fetch error--> Errored
//! any state --cancel--> Cancelled (no-op once finished)
//! ```
//!
//! Each tick fetches the status once. Every successful fetch is reported
//! through [`JobObserver::on_update`]; a `completed` status triggers exactly
//! one result fetch and one [`JobObserver::on_complete`]. Transport failures
//! end polling immediately.

use crate::deadline::within;
use crate::handle::JobHandle;
use crate::scheduler::ScheduledTask;
use async_trait::async_trait;
use report_client::ReportBackend;
use report_core::{
    AnalysisResult, Error, JobKind, JobStatus, JobStatusSnapshot, ReportResult, Result,
};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of a finished job
#[derive(Debug, Clone, PartialEq)]
pub enum JobCompletion {
    Report(ReportResult),
    Analysis(AnalysisResult),
}

impl JobCompletion {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Report(_) => JobKind::Report,
            Self::Analysis(_) => JobKind::Analysis,
        }
    }
}

/// Why polling ended without a result
#[derive(Debug)]
pub enum PollFailure {
    /// The backend reported the job as failed
    Job { error: String },
    /// A status or result fetch failed; the job itself may still be running
    Transient(Error),
}

impl fmt::Display for PollFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Job { error } => f.write_str(error),
            Self::Transient(err) => write!(f, "{err}"),
        }
    }
}

/// Lifecycle of a poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Completed,
    Failed,
    Errored,
    Cancelled,
}

impl PollerState {
    /// Whether no further callback can fire
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::Idle | Self::Polling)
    }
}

/// Where a poller reads status and results from
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Kind of job this source serves
    fn kind(&self) -> JobKind;

    /// Current status of the job
    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusSnapshot>;

    /// Result of a completed job
    async fn fetch_result(&self, job_id: &str) -> Result<JobCompletion>;
}

/// Report jobs served by a [`ReportBackend`]
pub struct ReportJobSource {
    backend: Arc<dyn ReportBackend>,
}

impl ReportJobSource {
    pub fn new(backend: Arc<dyn ReportBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl JobSource for ReportJobSource {
    fn kind(&self) -> JobKind {
        JobKind::Report
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusSnapshot> {
        self.backend.get_report_job_status(job_id).await
    }

    async fn fetch_result(&self, job_id: &str) -> Result<JobCompletion> {
        self.backend
            .get_report_result(job_id)
            .await
            .map(JobCompletion::Report)
    }
}

/// Analysis jobs served by a [`ReportBackend`]
pub struct AnalysisJobSource {
    backend: Arc<dyn ReportBackend>,
}

impl AnalysisJobSource {
    pub fn new(backend: Arc<dyn ReportBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl JobSource for AnalysisJobSource {
    fn kind(&self) -> JobKind {
        JobKind::Analysis
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusSnapshot> {
        self.backend.get_analysis_job_status(job_id).await
    }

    async fn fetch_result(&self, job_id: &str) -> Result<JobCompletion> {
        self.backend
            .get_analysis_result(job_id)
            .await
            .map(JobCompletion::Analysis)
    }
}

/// Receives poller events.
///
/// Callbacks run on the polling task and must not block.
pub trait JobObserver: Send + Sync {
    fn on_update(&self, handle: &JobHandle, snapshot: &JobStatusSnapshot);
    fn on_complete(&self, handle: &JobHandle, completion: JobCompletion);
    fn on_fail(&self, handle: &JobHandle, failure: PollFailure);
}

/// Timing of a poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    pub interval: Duration,
    pub status_timeout: Duration,
    pub result_timeout: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            status_timeout: Duration::from_secs(10),
            result_timeout: Duration::from_secs(30),
        }
    }
}

/// Polls one job until it reaches a terminal state or is cancelled
pub struct StatusPoller {
    handle: JobHandle,
    source: Arc<dyn JobSource>,
    timing: PollTiming,
    token: CancellationToken,
    state: Arc<watch::Sender<PollerState>>,
    task: Option<ScheduledTask>,
}

impl StatusPoller {
    pub fn new(handle: JobHandle, source: Arc<dyn JobSource>, timing: PollTiming) -> Self {
        debug_assert_eq!(handle.kind(), source.kind(), "source serves another job kind");
        let (state, _) = watch::channel(PollerState::Idle);
        Self {
            handle,
            source,
            timing,
            token: CancellationToken::new(),
            state: Arc::new(state),
            task: None,
        }
    }

    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    /// Begin polling; a no-op unless the poller is idle
    pub fn start(&mut self, observer: Arc<dyn JobObserver>) {
        let started = self.state.send_if_modified(|state| {
            if *state == PollerState::Idle {
                *state = PollerState::Polling;
                true
            } else {
                false
            }
        });
        if !started {
            debug!("Poller for {} not idle, start ignored", self.handle);
            return;
        }

        info!("Polling {} every {:?}", self.handle, self.timing.interval);

        let tick = Arc::new(Tick {
            handle: self.handle.clone(),
            source: Arc::clone(&self.source),
            observer,
            timing: self.timing,
            token: self.token.clone(),
            state: Arc::clone(&self.state),
            result_claimed: AtomicBool::new(false),
        });

        self.task = Some(ScheduledTask::spawn(
            self.timing.interval,
            self.token.clone(),
            move || {
                let tick = Arc::clone(&tick);
                async move { tick.run().await }
            },
        ));
    }

    /// Stop polling; idempotent, and a no-op once the poller finished
    pub fn cancel(&self) {
        self.token.cancel();
        let cancelled = self.state.send_if_modified(|state| {
            if state.is_finished() {
                false
            } else {
                *state = PollerState::Cancelled;
                true
            }
        });
        if cancelled {
            debug!("Cancelled poller for {}", self.handle);
        }
    }

    /// Wait until the poller finished; returns immediately when never started
    pub async fn wait(&self) -> PollerState {
        let mut rx = self.state.subscribe();
        let result = rx
            .wait_for(|state| *state != PollerState::Polling)
            .await
            .map(|state| *state);
        result.unwrap_or_else(|_| self.state())
    }

    /// Wait for the polling task itself to exit
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            task.join().await;
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Shared context of the polling task
struct Tick {
    handle: JobHandle,
    source: Arc<dyn JobSource>,
    observer: Arc<dyn JobObserver>,
    timing: PollTiming,
    token: CancellationToken,
    state: Arc<watch::Sender<PollerState>>,
    result_claimed: AtomicBool,
}

impl Tick {
    async fn run(&self) -> ControlFlow<()> {
        let snapshot = match within(
            "fetch_status",
            self.timing.status_timeout,
            self.source.fetch_status(self.handle.id()),
        )
        .await
        {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("Status fetch for {} failed: {}", self.handle, err);
                self.finish(PollerState::Errored, PollFailure::Transient(err));
                return ControlFlow::Break(());
            }
        };

        if self.token.is_cancelled() {
            return ControlFlow::Break(());
        }

        debug!("{} {}", self.handle, snapshot.progress_line());
        self.observer.on_update(&self.handle, &snapshot);

        match snapshot.status {
            JobStatus::Completed => {
                self.complete().await;
                ControlFlow::Break(())
            }
            JobStatus::Failed => {
                let error = snapshot
                    .error
                    .clone()
                    .filter(|error| !error.is_empty())
                    .unwrap_or_else(|| format!("{} job failed", self.handle.kind()));
                warn!("{} failed: {}", self.handle, error);
                self.finish(PollerState::Failed, PollFailure::Job { error });
                ControlFlow::Break(())
            }
            JobStatus::Queued | JobStatus::Running | JobStatus::Unknown => {
                ControlFlow::Continue(())
            }
        }
    }

    async fn complete(&self) {
        if self.result_claimed.swap(true, Ordering::SeqCst) {
            return;
        }

        match within(
            "fetch_result",
            self.timing.result_timeout,
            self.source.fetch_result(self.handle.id()),
        )
        .await
        {
            Ok(completion) => {
                if self.claim(PollerState::Completed) {
                    info!("{} completed", self.handle);
                    self.observer.on_complete(&self.handle, completion);
                }
            }
            Err(err) => {
                warn!("Result fetch for {} failed: {}", self.handle, err);
                self.finish(PollerState::Errored, PollFailure::Transient(err));
            }
        }
    }

    fn finish(&self, next: PollerState, failure: PollFailure) {
        if self.claim(next) {
            self.observer.on_fail(&self.handle, failure);
        }
    }

    /// Move from `Polling` to a terminal state; only the first caller wins
    fn claim(&self, next: PollerState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == PollerState::Polling {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}
