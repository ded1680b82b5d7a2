//! Report backend trait definition

use async_trait::async_trait;
use report_core::{
    Account, AnalysisResult, CoverageReport, JobRequest, JobStatusSnapshot, ReportResult, Result,
};

/// Acknowledgement of a launched job
#[derive(Debug, Clone, PartialEq)]
pub struct JobAccepted {
    /// Backend id of the job; for analysis jobs this is the report id
    pub job_id: String,
    /// Status reported at launch
    pub snapshot: JobStatusSnapshot,
}

/// Trait for report backends
///
/// The job layer only talks to the backend through this trait, so tests can
/// substitute a scripted or mocked implementation for the HTTP client.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait ReportBackend: Send + Sync {
    /// Start a report job
    async fn launch_report_job(&self, request: &JobRequest) -> Result<JobAccepted>;

    /// Current progress of a report job
    async fn get_report_job_status(&self, report_id: &str) -> Result<JobStatusSnapshot>;

    /// Full report of a finished job
    async fn get_report_result(&self, report_id: &str) -> Result<ReportResult>;

    /// Check market-data coverage for the scope and window of `request`
    async fn check_market_coverage(&self, request: &JobRequest) -> Result<CoverageReport>;

    /// Start an AI narrative job for an existing report
    async fn launch_analysis_job(
        &self,
        report_id: &str,
        api_key: &str,
        refresh: bool,
    ) -> Result<JobAccepted>;

    /// Current progress of the narrative job of a report
    async fn get_analysis_job_status(&self, report_id: &str) -> Result<JobStatusSnapshot>;

    /// Narrative fields of a report
    async fn get_analysis_result(&self, report_id: &str) -> Result<AnalysisResult>;

    /// Run a report and wait for it in a single call
    async fn run_report_sync(&self, request: &JobRequest) -> Result<ReportResult>;

    /// Generate a narrative and wait for it in a single call
    async fn run_analysis_sync(
        &self,
        report_id: &str,
        api_key: &str,
        refresh: bool,
    ) -> Result<AnalysisResult>;

    /// Accounts a report can be scoped to
    async fn list_accounts(&self) -> Result<Vec<Account>>;
}
