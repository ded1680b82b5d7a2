//! Display values derived from a report

use crate::report::ReportResult;
use crate::request::NetMode;
use crate::sanitize::sanitize;
use crate::valuation::net_value;
use serde::Serialize;

/// Values the presentation layer shows for one report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub report_id: String,
    pub net_mode: NetMode,
    pub net_value: f64,
    pub trading_fees: f64,
    pub funding_pnl: f64,
    pub trade_count: u64,
    pub turnover: f64,
    pub anomaly_count: usize,
    /// AI narrative with evidence markers removed
    pub narrative: Option<String>,
    pub model: Option<String>,
    pub schema_version: Option<String>,
}

impl ReportView {
    pub fn new(report: &ReportResult, net_mode: NetMode) -> Self {
        let period = report.period();
        Self {
            report_id: report.id.clone(),
            net_mode,
            net_value: net_value(period, net_mode),
            trading_fees: period.map_or(0.0, |p| p.trading_fees),
            funding_pnl: period.map_or(0.0, |p| p.funding_pnl),
            trade_count: period.map_or(0, |p| p.trade_count),
            turnover: period.map_or(0.0, |p| p.turnover),
            anomaly_count: report.anomalies.len(),
            narrative: report
                .ai_narrative
                .as_deref()
                .filter(|text| !text.is_empty())
                .map(sanitize),
            model: report.ai_model.clone(),
            schema_version: report.schema_version.clone(),
        }
    }
}
