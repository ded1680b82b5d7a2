//! Report session orchestration
//!
//! A [`ReportSession`] owns everything one consumer needs to run reports:
//! the backend handle, the launcher and coverage checker, at most one poller
//! per job kind and the [`ReportState`] published through a `watch`
//! channel. Presentation code subscribes to the channel and never mutates
//! state itself.
//!
//! ```no_run
//! use report_client::HttpReportClient;
//! use report_core::{JobRequest, Preset};
//! use report_jobs::{CoverageMode, ReportSession, SessionConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> report_core::Result<()> {
//! let backend = Arc::new(HttpReportClient::from_env()?);
//! let mut session = ReportSession::new(backend, SessionConfig::default())?;
//!
//! session
//!     .run_report(JobRequest::preset(Preset::Last30d), CoverageMode::Check)
//!     .await?;
//! session.wait_report().await;
//!
//! if let Some(report) = session.state().report {
//!     println!("report {} ready", report.id);
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::SessionConfig;
use crate::coverage::CoverageChecker;
use crate::deadline::within;
use crate::handle::JobHandle;
use crate::launcher::{JobLauncher, Launched};
use crate::poller::{
    AnalysisJobSource, JobCompletion, JobObserver, JobSource, PollFailure, PollTiming,
    PollerState, ReportJobSource, StatusPoller,
};
use crate::state::ReportState;
use report_client::ReportBackend;
use report_core::{AnalysisResult, Error, JobKind, JobRequest, JobStatusSnapshot, ReportResult, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Whether a report run checks market coverage first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoverageMode {
    /// Check coverage and include market metrics when the data is there
    #[default]
    Check,
    /// Skip the check and produce a fees-only report
    Skip,
}

/// Applies poller events to the shared state
struct StateObserver {
    state: Arc<watch::Sender<ReportState>>,
}

impl StateObserver {
    fn update(&self, transition: impl FnOnce(ReportState) -> ReportState) {
        self.state
            .send_modify(|state| *state = transition(std::mem::take(state)));
    }
}

impl JobObserver for StateObserver {
    fn on_update(&self, handle: &JobHandle, snapshot: &JobStatusSnapshot) {
        let snapshot = snapshot.clone();
        self.update(|state| state.apply_update(handle.kind(), snapshot));
    }

    fn on_complete(&self, handle: &JobHandle, completion: JobCompletion) {
        debug!("Storing result of {}", handle);
        self.update(|state| state.apply_complete(completion));
    }

    fn on_fail(&self, handle: &JobHandle, failure: PollFailure) {
        self.update(|state| state.apply_fail(handle.kind(), &failure));
    }
}

/// Orchestrates report and analysis jobs for one consumer
pub struct ReportSession {
    backend: Arc<dyn ReportBackend>,
    config: SessionConfig,
    launcher: JobLauncher,
    coverage: CoverageChecker,
    observer: Arc<StateObserver>,
    report_poller: Option<StatusPoller>,
    analysis_poller: Option<StatusPoller>,
}

impl ReportSession {
    /// Create a session; fails if `config` is invalid
    pub fn new(backend: Arc<dyn ReportBackend>, config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let (state, _) = watch::channel(ReportState::default());
        Ok(Self {
            launcher: JobLauncher::new(Arc::clone(&backend), config.request_timeout),
            coverage: CoverageChecker::new(Arc::clone(&backend), config.request_timeout),
            backend,
            config,
            observer: Arc::new(StateObserver {
                state: Arc::new(state),
            }),
            report_poller: None,
            analysis_poller: None,
        })
    }

    /// Receiver that sees every state change
    pub fn subscribe(&self) -> watch::Receiver<ReportState> {
        self.observer.state.subscribe()
    }

    /// Copy of the current state
    pub fn state(&self) -> ReportState {
        self.observer.state.borrow().clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn coverage(&self) -> &CoverageChecker {
        &self.coverage
    }

    /// State of the current poller of `kind`, if one was started
    pub fn poller_state(&self, kind: JobKind) -> Option<PollerState> {
        self.poller(kind).map(StatusPoller::state)
    }

    /// Launch a report job and start polling it.
    ///
    /// With [`CoverageMode::Check`] the market flag is decided by the coverage
    /// gate; with [`CoverageMode::Skip`] the report is fees-only.
    pub async fn run_report(&mut self, request: JobRequest, mode: CoverageMode) -> Result<JobHandle> {
        request.validate()?;
        let request = self.prepare(request, mode).await;

        let launched = self
            .launcher
            .launch_report(&request)
            .await
            .inspect_err(|e| self.record_launch_error(JobKind::Report, e))?;

        Ok(self.track(launched))
    }

    /// Launch an AI narrative job for the current report and start polling it
    pub async fn generate_analysis(&mut self, api_key: &str, refresh: bool) -> Result<JobHandle> {
        let report_id = self.current_report_id()?;

        let launched = self
            .launcher
            .launch_analysis(&report_id, api_key, refresh)
            .await
            .inspect_err(|e| self.record_launch_error(JobKind::Analysis, e))?;

        Ok(self.track(launched))
    }

    /// Load an existing report into state, replacing the current one
    pub async fn open_report(&mut self, report_id: &str) -> Result<ReportResult> {
        if report_id.trim().is_empty() {
            return Err(Error::Validation("report id must not be empty".to_string()));
        }
        self.cancel_poller(JobKind::Report);

        let report = within(
            "get_report_result",
            self.config.result_timeout,
            self.backend.get_report_result(report_id),
        )
        .await
        .inspect_err(|e| {
            let message = e.to_string();
            self.observer
                .update(|s| s.apply_error(JobKind::Report, message));
        })?;
        debug!("Opened report {}", report.id);

        let stored = report.clone();
        self.observer
            .update(|s| s.apply_complete(JobCompletion::Report(stored)));
        Ok(report)
    }

    /// Run a report through the synchronous endpoint and wait for it.
    ///
    /// Any report poller is cancelled first; the two paths never run together.
    pub async fn run_report_blocking(
        &mut self,
        request: JobRequest,
        mode: CoverageMode,
    ) -> Result<ReportResult> {
        request.validate()?;
        self.cancel_poller(JobKind::Report);
        let request = self.prepare(request, mode).await;

        self.observer
            .update(|s| s.apply_sync_start(JobKind::Report));
        info!("Running report synchronously");

        let outcome = within(
            "run_report_sync",
            self.config.sync_timeout,
            self.backend.run_report_sync(&request),
        )
        .await;
        self.finish_blocking(JobKind::Report, outcome.map(JobCompletion::Report))
            .and_then(|completion| match completion {
                JobCompletion::Report(report) => Ok(report),
                JobCompletion::Analysis(_) => Err(Error::Generic("unexpected analysis result".to_string())),
            })
    }

    /// Generate a narrative through the synchronous endpoint and wait for it
    pub async fn generate_analysis_blocking(
        &mut self,
        api_key: &str,
        refresh: bool,
    ) -> Result<AnalysisResult> {
        let report_id = self.current_report_id()?;
        if api_key.trim().is_empty() {
            return Err(Error::Validation("analysis API key is required".to_string()));
        }
        self.cancel_poller(JobKind::Analysis);

        self.observer
            .update(|s| s.apply_sync_start(JobKind::Analysis));
        info!("Generating analysis of {} synchronously", report_id);

        let outcome = within(
            "run_analysis_sync",
            self.config.sync_timeout,
            self.backend.run_analysis_sync(&report_id, api_key, refresh),
        )
        .await;
        self.finish_blocking(JobKind::Analysis, outcome.map(JobCompletion::Analysis))
            .and_then(|completion| match completion {
                JobCompletion::Analysis(analysis) => Ok(analysis),
                JobCompletion::Report(_) => Err(Error::Generic("unexpected report result".to_string())),
            })
    }

    /// Wait for the current report poller to finish
    pub async fn wait_report(&self) -> Option<PollerState> {
        match &self.report_poller {
            Some(poller) => Some(poller.wait().await),
            None => None,
        }
    }

    /// Wait for the current analysis poller to finish
    pub async fn wait_analysis(&self) -> Option<PollerState> {
        match &self.analysis_poller {
            Some(poller) => Some(poller.wait().await),
            None => None,
        }
    }

    /// Cancel every poller; finished pollers are left as they are
    pub fn cancel_all(&mut self) {
        for poller in [&self.report_poller, &self.analysis_poller]
            .into_iter()
            .flatten()
        {
            poller.cancel();
        }
        self.observer.update(ReportState::apply_cancel);
    }

    async fn prepare(&self, request: JobRequest, mode: CoverageMode) -> JobRequest {
        match mode {
            CoverageMode::Skip => {
                self.observer.update(|s| s.apply_warning(None));
                request.with_market(false)
            }
            CoverageMode::Check => {
                let gate = self.coverage.gate(request).await;
                let warning = gate.warning.clone();
                self.observer.update(|s| s.apply_warning(warning));
                gate.request
            }
        }
    }

    /// Replace the poller of the launched job's kind and start the new one
    fn track(&mut self, launched: Launched) -> JobHandle {
        let Launched { handle, snapshot } = launched;
        let kind = handle.kind();
        self.cancel_poller(kind);

        let launch_handle = handle.clone();
        self.observer
            .update(|s| s.apply_launch(launch_handle, snapshot));

        let source: Arc<dyn JobSource> = match kind {
            JobKind::Report => Arc::new(ReportJobSource::new(Arc::clone(&self.backend))),
            JobKind::Analysis => Arc::new(AnalysisJobSource::new(Arc::clone(&self.backend))),
        };
        let timing = PollTiming {
            interval: self.config.poll_interval,
            status_timeout: self.config.request_timeout,
            result_timeout: self.config.result_timeout,
        };

        let mut poller = StatusPoller::new(handle.clone(), source, timing);
        poller.start(Arc::clone(&self.observer) as Arc<dyn JobObserver>);
        *self.poller_slot(kind) = Some(poller);
        handle
    }

    fn finish_blocking(&self, kind: JobKind, outcome: Result<JobCompletion>) -> Result<JobCompletion> {
        match outcome {
            Ok(completion) => {
                let stored = completion.clone();
                self.observer.update(|s| s.apply_complete(stored));
                Ok(completion)
            }
            Err(err) => {
                let message = err.to_string();
                self.observer.update(|s| s.apply_error(kind, message));
                Err(err)
            }
        }
    }

    fn current_report_id(&self) -> Result<String> {
        self.observer
            .state
            .borrow()
            .report
            .as_ref()
            .map(|report| report.id.clone())
            .ok_or_else(|| Error::Validation("no report to analyse; run a report first".to_string()))
    }

    fn cancel_poller(&mut self, kind: JobKind) {
        if let Some(previous) = self.poller_slot(kind).take() {
            debug!("Replacing poller for {}", previous.handle());
            let was_polling = previous.state() == PollerState::Polling;
            previous.cancel();
            if was_polling {
                self.observer.update(|s| s.apply_cancel_kind(kind));
            }
        }
    }

    /// A failed launch leaves a job that is still being polled tracked
    fn record_launch_error(&self, kind: JobKind, err: &Error) {
        let message = err.to_string();
        if self.poller_state(kind) == Some(PollerState::Polling) {
            self.observer
                .update(|s| s.apply_side_error(kind, message));
        } else {
            self.observer.update(|s| s.apply_error(kind, message));
        }
    }

    fn poller(&self, kind: JobKind) -> Option<&StatusPoller> {
        match kind {
            JobKind::Report => self.report_poller.as_ref(),
            JobKind::Analysis => self.analysis_poller.as_ref(),
        }
    }

    fn poller_slot(&mut self, kind: JobKind) -> &mut Option<StatusPoller> {
        match kind {
            JobKind::Report => &mut self.report_poller,
            JobKind::Analysis => &mut self.analysis_poller,
        }
    }
}

impl Drop for ReportSession {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use report_client::{JobAccepted, MockReportBackend};
    use report_core::{CoverageReport, JobStatus, PeriodSummary, Preset};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn accepted(id: &str, status: JobStatus) -> JobAccepted {
        JobAccepted {
            job_id: id.to_string(),
            snapshot: JobStatusSnapshot::new(status).with_percent(1),
        }
    }

    fn snapshot(status: JobStatus, percent: i64) -> JobStatusSnapshot {
        JobStatusSnapshot::new(status).with_percent(percent)
    }

    fn period_for(id: &str) -> PeriodSummary {
        let base = if id == "r-1" { 0.1 } else { 7.3 };
        PeriodSummary {
            trade_count: 42,
            turnover: 125_000.5,
            trading_fees: 37.125,
            funding_pnl: -4.2,
            net_after_fees: 100.0 + base,
            net_after_fees_and_funding: 95.8 + base,
            ..PeriodSummary::default()
        }
    }

    fn sample_report(id: &str) -> ReportResult {
        let mut report = ReportResult::new(id).with_period(period_for(id));
        report.base_narrative = format!("base narrative of {id}");
        report.schema_version = Some("2".to_string());
        report
    }

    fn sample_analysis(report_id: &str) -> AnalysisResult {
        AnalysisResult {
            report_id: report_id.to_string(),
            narrative: Some("Fees ate most of the edge [e1].".to_string()),
            model: Some("deepseek-chat".to_string()),
            generated_at: None,
            status: Some("success".to_string()),
            error: None,
        }
    }

    fn session(backend: MockReportBackend) -> ReportSession {
        ReportSession::new(Arc::new(backend), SessionConfig::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_lifecycle_end_to_end() {
        let mut backend = MockReportBackend::new();
        backend
            .expect_check_market_coverage()
            .times(1)
            .returning(|_| {
                Ok(CoverageReport {
                    has_market: true,
                    ..CoverageReport::default()
                })
            });
        backend
            .expect_launch_report_job()
            .withf(|request: &JobRequest| request.include_market)
            .times(1)
            .returning(|_| Ok(accepted("r-1", JobStatus::Queued)));

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        backend
            .expect_get_report_job_status()
            .returning(move |_| {
                Ok(match counter.fetch_add(1, Ordering::SeqCst) {
                    0 => snapshot(JobStatus::Running, 40),
                    1 => snapshot(JobStatus::Running, 75),
                    _ => snapshot(JobStatus::Completed, 100),
                })
            });
        backend
            .expect_get_report_result()
            .times(1)
            .returning(|id| Ok(sample_report(id)));

        let mut session = session(backend);
        let mut updates = session.subscribe();

        let handle = session
            .run_report(JobRequest::preset(Preset::Last30d), CoverageMode::Check)
            .await
            .unwrap();
        assert_eq!(handle.id(), "r-1");
        assert!(updates.has_changed().unwrap());
        assert!(updates.borrow_and_update().report_job.running);

        assert_eq!(session.wait_report().await, Some(PollerState::Completed));
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        let state = session.state();
        let report = state.report.unwrap();
        assert_eq!(report.id, "r-1");
        assert_eq!(report.period(), Some(&period_for("r-1")));
        assert!(!state.report_job.running);
        assert!(state.report_job.error.is_none());
        assert!(state.warning.is_none());
        assert_eq!(
            state.report_job.snapshot.map(|s| (s.status, s.percent)),
            Some((JobStatus::Completed, 100))
        );

        // Cancelling a finished session is harmless.
        session.cancel_all();
        assert_eq!(
            session.poller_state(JobKind::Report),
            Some(PollerState::Completed)
        );
        assert_eq!(session.state().report.map(|r| r.id), Some("r-1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_report_and_analysis() {
        let mut backend = MockReportBackend::new();

        let launches = Arc::new(AtomicUsize::new(0));
        let launch_counter = Arc::clone(&launches);
        backend.expect_launch_report_job().returning(move |_| {
            let n = launch_counter.fetch_add(1, Ordering::SeqCst);
            Ok(accepted(if n == 0 { "r-1" } else { "r-2" }, JobStatus::Queued))
        });

        // First report completes on its first tick; the second needs six.
        let report_ticks = Arc::new(AtomicUsize::new(0));
        let report_counter = Arc::clone(&report_ticks);
        backend
            .expect_get_report_job_status()
            .returning(move |_| {
                let n = report_counter.fetch_add(1, Ordering::SeqCst);
                Ok(if n == 0 || n >= 6 {
                    snapshot(JobStatus::Completed, 100)
                } else {
                    snapshot(JobStatus::Running, 10 * n as i64)
                })
            });
        backend
            .expect_get_report_result()
            .times(2)
            .returning(|id| Ok(sample_report(id)));

        backend
            .expect_launch_analysis_job()
            .withf(|id, key, refresh| id == "r-1" && key == "sk-test" && !*refresh)
            .times(1)
            .returning(|id, _, _| Ok(accepted(id, JobStatus::Running)));
        let analysis_ticks = Arc::new(AtomicUsize::new(0));
        let analysis_counter = Arc::clone(&analysis_ticks);
        backend
            .expect_get_analysis_job_status()
            .returning(move |_| {
                Ok(if analysis_counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    snapshot(JobStatus::Running, 0)
                } else {
                    snapshot(JobStatus::Completed, 100)
                })
            });
        backend
            .expect_get_analysis_result()
            .times(1)
            .returning(|id| Ok(sample_analysis(id)));

        let mut session = session(backend);
        session
            .run_report(JobRequest::default(), CoverageMode::Skip)
            .await
            .unwrap();
        session.wait_report().await;
        let before = session.state().report.unwrap();

        session
            .run_report(JobRequest::default(), CoverageMode::Skip)
            .await
            .unwrap();
        session.generate_analysis("sk-test", false).await.unwrap();

        assert_eq!(session.wait_analysis().await, Some(PollerState::Completed));
        let state = session.state();
        assert!(state.report_job.running, "second report should still be polling");

        let after = state.report.unwrap();
        assert_eq!(after.id, "r-1");
        assert_eq!(after.ai_narrative.as_deref(), Some("Fees ate most of the edge [e1]."));
        assert_eq!(after.ai_model.as_deref(), Some("deepseek-chat"));
        assert_eq!(after.summary, before.summary);
        assert_eq!(after.base_narrative, before.base_narrative);
        assert_eq!(after.schema_version, before.schema_version);
        let (p0, p1) = (before.period().unwrap(), after.period().unwrap());
        assert_eq!(p0.net_after_fees.to_bits(), p1.net_after_fees.to_bits());
        assert_eq!(
            p0.net_after_fees_and_funding.to_bits(),
            p1.net_after_fees_and_funding.to_bits()
        );
        assert_eq!(p0.trading_fees.to_bits(), p1.trading_fees.to_bits());
        assert_eq!(p0.funding_pnl.to_bits(), p1.funding_pnl.to_bits());

        assert_eq!(session.wait_report().await, Some(PollerState::Completed));
        let report = session.state().report.unwrap();
        assert_eq!(report.id, "r-2");
        assert!(report.ai_narrative.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_coverage_failure_degrades_to_fees_only() {
        let mut backend = MockReportBackend::new();
        backend
            .expect_check_market_coverage()
            .returning(|_| Err(Error::timeout("check_market_coverage", Duration::from_secs(10))));
        backend
            .expect_launch_report_job()
            .withf(|request: &JobRequest| !request.include_market)
            .times(1)
            .returning(|_| Ok(accepted("r-1", JobStatus::Queued)));
        backend
            .expect_get_report_job_status()
            .returning(|_| Ok(snapshot(JobStatus::Running, 5)));

        let mut session = session(backend);
        session
            .run_report(JobRequest::default().with_market(true), CoverageMode::Check)
            .await
            .unwrap();

        let warning = session.state().warning.unwrap();
        assert!(warning.contains("degraded to fees-only"), "{warning}");
        assert!(warning.contains("timed out"));
        session.cancel_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_mode_never_checks_and_forces_fees_only() {
        let mut backend = MockReportBackend::new();
        backend.expect_check_market_coverage().never();
        backend
            .expect_launch_report_job()
            .withf(|request: &JobRequest| !request.include_market)
            .times(1)
            .returning(|_| Ok(accepted("r-1", JobStatus::Queued)));
        backend
            .expect_get_report_job_status()
            .returning(|_| Ok(snapshot(JobStatus::Queued, 1)));

        let mut session = session(backend);
        session
            .run_report(JobRequest::default().with_market(true), CoverageMode::Skip)
            .await
            .unwrap();
        session.cancel_all();
        assert_eq!(
            session.poller_state(JobKind::Report),
            Some(PollerState::Cancelled)
        );
        assert!(!session.state().report_job.running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_requires_a_report() {
        let mut backend = MockReportBackend::new();
        backend.expect_launch_analysis_job().never();

        let mut session = session(backend);
        let err = session.generate_analysis("sk", false).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(session.wait_analysis().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure_is_returned_and_recorded() {
        let mut backend = MockReportBackend::new();
        backend
            .expect_launch_report_job()
            .returning(|_| Err(Error::Auth("Invalid token".to_string())));

        let mut session = session(backend);
        let err = session
            .run_report(JobRequest::default(), CoverageMode::Skip)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert_eq!(session.wait_report().await, None);
        assert_eq!(
            session.state().report_job.error.as_deref(),
            Some("Authentication failed: Invalid token")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_relaunch_keeps_running_job_tracked() {
        let mut backend = MockReportBackend::new();
        let launches = Arc::new(AtomicUsize::new(0));
        let launch_counter = Arc::clone(&launches);
        backend.expect_launch_report_job().returning(move |_| {
            if launch_counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(accepted("r-1", JobStatus::Queued))
            } else {
                Err(Error::Transport("reset".to_string()))
            }
        });
        backend
            .expect_get_report_job_status()
            .returning(|_| Ok(snapshot(JobStatus::Running, 30)));

        let mut session = session(backend);
        session
            .run_report(JobRequest::default(), CoverageMode::Skip)
            .await
            .unwrap();
        let err = session
            .run_report(JobRequest::default(), CoverageMode::Skip)
            .await
            .unwrap_err();
        assert!(err.is_transport());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(
            session.poller_state(JobKind::Report),
            Some(PollerState::Polling)
        );
        let track = session.state().report_job;
        assert!(track.running);
        assert_eq!(track.error.as_deref(), Some("Transport error: reset"));
        assert_eq!(track.handle.as_ref().map(JobHandle::id), Some("r-1"));
        assert_eq!(track.snapshot.map(|s| s.percent), Some(30));
        session.cancel_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_analysis_relaunch_keeps_running_job_tracked() {
        let mut backend = MockReportBackend::new();
        backend
            .expect_get_report_result()
            .returning(|id| Ok(sample_report(id)));
        let launches = Arc::new(AtomicUsize::new(0));
        let launch_counter = Arc::clone(&launches);
        backend
            .expect_launch_analysis_job()
            .returning(move |id, _, _| {
                if launch_counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(accepted(id, JobStatus::Running))
                } else {
                    Err(Error::Api {
                        status: 429,
                        message: "too many requests".to_string(),
                    })
                }
            });
        backend
            .expect_get_analysis_job_status()
            .returning(|_| Ok(snapshot(JobStatus::Running, 0)));

        let mut session = session(backend);
        session.open_report("r-1").await.unwrap();
        session.generate_analysis("sk", false).await.unwrap();
        assert!(session.generate_analysis("sk", true).await.is_err());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            session.poller_state(JobKind::Analysis),
            Some(PollerState::Polling)
        );
        let track = session.state().analysis_job;
        assert!(track.running);
        assert_eq!(track.error.as_deref(), Some("too many requests"));
        session.cancel_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_report_failure_stops_replaced_job() {
        let mut backend = MockReportBackend::new();
        backend
            .expect_launch_report_job()
            .returning(|_| Ok(accepted("r-1", JobStatus::Queued)));
        backend
            .expect_get_report_job_status()
            .returning(|_| Ok(snapshot(JobStatus::Running, 20)));
        backend.expect_get_report_result().returning(|_| {
            Err(Error::Api {
                status: 404,
                message: "Report not found".to_string(),
            })
        });

        let mut session = session(backend);
        session
            .run_report(JobRequest::default(), CoverageMode::Skip)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(session.state().report_job.running);

        let err = session.open_report("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Report not found");

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(session.poller_state(JobKind::Report), None);
        let track = session.state().report_job;
        assert!(!track.running);
        assert_eq!(track.error.as_deref(), Some("Report not found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacing_live_poller_stops_its_track() {
        let mut backend = MockReportBackend::new();
        backend
            .expect_launch_report_job()
            .returning(|_| Ok(accepted("r-1", JobStatus::Queued)));
        backend
            .expect_get_report_job_status()
            .returning(|_| Ok(snapshot(JobStatus::Running, 20)));
        backend
            .expect_get_report_result()
            .returning(|id| Ok(sample_report(id)));

        let mut session = session(backend);
        session
            .run_report(JobRequest::default(), CoverageMode::Skip)
            .await
            .unwrap();
        assert!(session.state().report_job.running);

        session.open_report("r-5").await.unwrap();
        let state = session.state();
        assert!(!state.report_job.running);
        assert!(state.report_job.error.is_none());
        assert_eq!(state.report.map(|r| r.id), Some("r-5".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_relaunch_cancels_previous_poller() {
        let mut backend = MockReportBackend::new();
        let launches = Arc::new(AtomicUsize::new(0));
        let launch_counter = Arc::clone(&launches);
        backend.expect_launch_report_job().returning(move |_| {
            let n = launch_counter.fetch_add(1, Ordering::SeqCst);
            Ok(accepted(&format!("r-{}", n + 1), JobStatus::Queued))
        });

        let polled = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&polled);
        backend
            .expect_get_report_job_status()
            .returning(move |id| {
                recorder.lock().unwrap().push(id.to_string());
                Ok(snapshot(JobStatus::Running, 50))
            });

        let mut session = session(backend);
        session
            .run_report(JobRequest::default(), CoverageMode::Skip)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        session
            .run_report(JobRequest::default(), CoverageMode::Skip)
            .await
            .unwrap();
        let polled_before = polled.lock().unwrap().len();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let polled = polled.lock().unwrap().clone();
        assert!(polled_before >= 2);
        assert!(polled[..polled_before].iter().all(|id| id == "r-1"));
        assert!(polled[polled_before..].iter().all(|id| id == "r-2"));
        assert!(polled.len() > polled_before);
        session.cancel_all();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let mut backend = MockReportBackend::new();
        backend
            .expect_launch_report_job()
            .returning(|_| Ok(accepted("r-1", JobStatus::Queued)));
        backend
            .expect_get_report_job_status()
            .returning(|_| Ok(snapshot(JobStatus::Completed, 100)));
        backend.expect_get_report_result().never();

        let mut session = session(backend);
        let updates = session.subscribe();
        session
            .run_report(JobRequest::default(), CoverageMode::Skip)
            .await
            .unwrap();
        drop(session);

        tokio::time::sleep(Duration::from_secs(10)).await;
        let state = updates.borrow();
        assert!(state.report.is_none());
        assert!(!state.report_job.running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_paths_update_state() {
        let mut backend = MockReportBackend::new();
        backend
            .expect_run_report_sync()
            .times(1)
            .returning(|_| Ok(sample_report("r-9")));
        backend
            .expect_run_analysis_sync()
            .withf(|id, _, refresh| id == "r-9" && *refresh)
            .times(1)
            .returning(|id, _, _| Ok(sample_analysis(id)));
        backend.expect_get_report_job_status().never();

        let mut session = session(backend);
        let report = session
            .run_report_blocking(JobRequest::preset(Preset::Ytd), CoverageMode::Skip)
            .await
            .unwrap();
        assert_eq!(report.id, "r-9");
        assert_eq!(session.poller_state(JobKind::Report), None);

        let analysis = session.generate_analysis_blocking("sk", true).await.unwrap();
        assert_eq!(analysis.report_id, "r-9");

        let state = session.state();
        let current = state.report.unwrap();
        assert_eq!(current.period(), Some(&period_for("r-9")));
        assert!(current.has_ai_narrative());
        assert!(!state.report_job.running);
        assert!(!state.analysis_job.running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_report_enables_analysis() {
        let mut backend = MockReportBackend::new();
        backend
            .expect_get_report_result()
            .withf(|id| id == "r-7")
            .times(1)
            .returning(|id| Ok(sample_report(id)));
        backend
            .expect_launch_analysis_job()
            .withf(|id, _, _| id == "r-7")
            .times(1)
            .returning(|id, _, _| Ok(accepted(id, JobStatus::Completed)));
        backend
            .expect_get_analysis_job_status()
            .returning(|_| Ok(snapshot(JobStatus::Completed, 100)));
        backend
            .expect_get_analysis_result()
            .times(1)
            .returning(|id| Ok(sample_analysis(id)));

        let mut session = session(backend);
        assert!(matches!(
            session.open_report(" ").await,
            Err(Error::Validation(_))
        ));

        let report = session.open_report("r-7").await.unwrap();
        assert_eq!(report.id, "r-7");
        assert!(!session.state().report_job.running);

        session.generate_analysis("sk", false).await.unwrap();
        assert_eq!(session.wait_analysis().await, Some(PollerState::Completed));
        assert!(session.state().report.unwrap().has_ai_narrative());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_failure_is_recorded() {
        let mut backend = MockReportBackend::new();
        backend.expect_run_report_sync().returning(|_| {
            Err(Error::Api {
                status: 409,
                message: "sync is running".to_string(),
            })
        });

        let mut session = session(backend);
        let err = session
            .run_report_blocking(JobRequest::default(), CoverageMode::Skip)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "sync is running");
        assert_eq!(
            session.state().report_job.error.as_deref(),
            Some("sync is running")
        );
    }
}
