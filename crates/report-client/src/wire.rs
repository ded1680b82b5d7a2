//! Request payloads and response bodies of the report backend

use chrono::NaiveDate;
use report_core::timestamp;
use report_core::{
    AnalysisResult, JobRequest, JobStatus, JobStatusSnapshot, NetMode, Preset, TimeWindow,
};
use serde::{Deserialize, Serialize};

/// Window fields shared by report and coverage payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WindowFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl From<TimeWindow> for WindowFields {
    fn from(window: TimeWindow) -> Self {
        match window {
            TimeWindow::Preset(preset) => Self {
                preset: Some(preset),
                ..Self::default()
            },
            TimeWindow::Range { start, end } => Self {
                preset: None,
                start: Some(start),
                end: Some(end),
            },
        }
    }
}

/// Body of `POST /reports/run` and `POST /reports/run-async`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRunPayload<'a> {
    pub net_mode: NetMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_ids: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_id: Option<&'a str>,
    #[serde(flatten)]
    pub window: WindowFields,
    pub include_market: bool,
}

impl<'a> From<&'a JobRequest> for ReportRunPayload<'a> {
    fn from(request: &'a JobRequest) -> Self {
        Self {
            net_mode: request.net_mode,
            account_ids: request.scope.account_ids(),
            exchange_id: request.exchange_id.as_deref(),
            window: request.window.into(),
            include_market: request.include_market,
        }
    }
}

/// Body of `POST /market/coverage`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoveragePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_ids: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_id: Option<&'a str>,
    #[serde(flatten)]
    pub window: WindowFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<&'a [String]>,
}

impl<'a> From<&'a JobRequest> for CoveragePayload<'a> {
    fn from(request: &'a JobRequest) -> Self {
        Self {
            account_ids: request.scope.account_ids(),
            exchange_id: request.exchange_id.as_deref(),
            window: request.window.into(),
            symbols: None,
        }
    }
}

/// Progress body returned by `run-async` and `GET /reports/{id}/status`
#[derive(Debug, Clone, Deserialize)]
pub struct ReportStatusBody {
    pub report_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub percent: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ReportStatusBody {
    /// Normalise into a snapshot; unparseable timestamps become "now"
    pub fn into_snapshot(self) -> JobStatusSnapshot {
        let mut snapshot = JobStatusSnapshot::new(self.status).with_percent(self.percent.unwrap_or(0));
        if let Some(stage) = self.stage.filter(|stage| !stage.is_empty()) {
            snapshot = snapshot.with_stage(stage);
        }
        if let Some(message) = self.message {
            snapshot = snapshot.with_message(message);
        }
        if let Some(error) = self.error.filter(|error| !error.is_empty()) {
            snapshot = snapshot.with_error(error);
        }
        if let Some(updated_at) = self.updated_at.as_deref().and_then(timestamp::parse) {
            snapshot = snapshot.at(updated_at);
        }
        snapshot
    }
}

/// Analysis body returned by `deepseek-async`, `deepseek-status` and `deepseek`
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisStatusBody {
    pub report_id: String,
    #[serde(default)]
    pub report_md_llm: Option<String>,
    #[serde(default)]
    pub chart_spec_json: Option<String>,
    #[serde(default)]
    pub llm_model: Option<String>,
    #[serde(default)]
    pub llm_generated_at: Option<String>,
    #[serde(default)]
    pub llm_status: Option<String>,
    #[serde(default)]
    pub llm_error: Option<String>,
}

/// Map the backend's `llm_status` onto the shared job lifecycle
pub fn analysis_status(llm_status: Option<&str>) -> JobStatus {
    match llm_status {
        None | Some("") => JobStatus::Queued,
        Some("running") => JobStatus::Running,
        Some("success") => JobStatus::Completed,
        Some("failed") => JobStatus::Failed,
        Some(_) => JobStatus::Unknown,
    }
}

impl AnalysisStatusBody {
    /// Progress snapshot derived from `llm_status`
    pub fn snapshot(&self) -> JobStatusSnapshot {
        let status = analysis_status(self.llm_status.as_deref());
        let percent = if status.is_terminal() { 100 } else { 0 };
        let mut snapshot = JobStatusSnapshot::new(status)
            .with_stage("analysis")
            .with_percent(percent)
            .with_message(self.llm_status.clone().unwrap_or_else(|| "queued".to_string()));
        if status == JobStatus::Failed {
            snapshot = snapshot.with_error(
                self.llm_error
                    .clone()
                    .unwrap_or_else(|| "analysis failed".to_string()),
            );
        }
        if let Some(at) = self.llm_generated_at.as_deref().and_then(timestamp::parse) {
            snapshot = snapshot.at(at);
        }
        snapshot
    }

    /// Narrative fields as an analysis result
    pub fn into_result(self) -> AnalysisResult {
        AnalysisResult {
            generated_at: self.llm_generated_at.as_deref().and_then(timestamp::parse),
            report_id: self.report_id,
            narrative: self.report_md_llm,
            model: self.llm_model,
            status: self.llm_status,
            error: self.llm_error,
        }
    }
}
