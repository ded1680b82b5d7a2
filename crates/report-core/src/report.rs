//! Report and analysis result types
//!
//! Field names follow the backend's JSON so results deserialize directly from
//! response bodies; Rust-side names describe what the fields hold.

use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Totals for the reported period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    #[serde(rename = "trades", default)]
    pub trade_count: u64,
    #[serde(default)]
    pub turnover: f64,
    #[serde(default)]
    pub trading_fees: f64,
    #[serde(default)]
    pub funding_pnl: f64,
    #[serde(default)]
    pub net_after_fees: f64,
    #[serde(default)]
    pub net_after_fees_and_funding: f64,
    /// Remaining period metrics (fee rate, rebates, ...) kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Report summary: the period totals plus opaque sections
/// (scope, baseline, drawdown, rolling comparisons, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    #[serde(default)]
    pub period: Option<PeriodSummary>,
    #[serde(flatten)]
    pub sections: Map<String, Value>,
}

/// A completed cost/PnL report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    pub id: String,
    #[serde(default)]
    pub summary: ReportSummary,
    #[serde(default)]
    pub anomalies: Vec<Value>,
    #[serde(rename = "report_md", default)]
    pub base_narrative: String,
    #[serde(rename = "report_md_llm", default)]
    pub ai_narrative: Option<String>,
    #[serde(rename = "chart_spec_json", default)]
    pub chart_spec: Option<String>,
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(rename = "llm_model", default)]
    pub ai_model: Option<String>,
    #[serde(
        rename = "llm_generated_at",
        default,
        deserialize_with = "timestamp::deserialize_option"
    )]
    pub ai_generated_at: Option<DateTime<Utc>>,
    #[serde(rename = "llm_status", default)]
    pub ai_status: Option<String>,
    #[serde(rename = "llm_error", default)]
    pub ai_error: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

impl ReportResult {
    /// Create an empty report with the given id, stamped now
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            summary: ReportSummary::default(),
            anomalies: Vec::new(),
            base_narrative: String::new(),
            ai_narrative: None,
            chart_spec: None,
            schema_version: None,
            ai_model: None,
            ai_generated_at: None,
            ai_status: None,
            ai_error: None,
            created_at: Utc::now(),
        }
    }

    /// Attach period totals
    pub fn with_period(mut self, period: PeriodSummary) -> Self {
        self.summary.period = Some(period);
        self
    }

    /// Period totals, if the report has any
    pub fn period(&self) -> Option<&PeriodSummary> {
        self.summary.period.as_ref()
    }

    /// Whether an AI narrative has been generated for this report
    pub fn has_ai_narrative(&self) -> bool {
        self.ai_narrative.as_deref().is_some_and(|text| !text.is_empty())
    }
}

/// Outcome of an AI narrative job.
///
/// Refers to its report by id only; it never owns the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub report_id: String,
    #[serde(rename = "report_md_llm", default)]
    pub narrative: Option<String>,
    #[serde(rename = "llm_model", default)]
    pub model: Option<String>,
    #[serde(
        rename = "llm_generated_at",
        default,
        deserialize_with = "timestamp::deserialize_option"
    )]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(rename = "llm_status", default)]
    pub status: Option<String>,
    #[serde(rename = "llm_error", default)]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// Project the narrative fields out of a full report
    pub fn from_report(report: &ReportResult) -> Self {
        Self {
            report_id: report.id.clone(),
            narrative: report.ai_narrative.clone(),
            model: report.ai_model.clone(),
            generated_at: report.ai_generated_at,
            status: report.ai_status.clone(),
            error: report.ai_error.clone(),
        }
    }
}
