//! Terminal rendering of reports, coverage and accounts

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use report_core::{Account, CoverageReport, JobKind, NetMode, ReportView};
use report_jobs::ReportState;

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn net_label(mode: NetMode) -> &'static str {
    match mode {
        NetMode::FeesOnly => "Net after fees",
        NetMode::FeesPlusFunding => "Net after fees and funding",
    }
}

pub fn report_table(view: &ReportView) -> Table {
    let mut table = table(vec!["Metric", "Value"]);
    table
        .add_row(vec!["Report".to_string(), view.report_id.clone()])
        .add_row(vec![net_label(view.net_mode).to_string(), format!("{:.2}", view.net_value)])
        .add_row(vec!["Trading fees".to_string(), format!("{:.2}", view.trading_fees)])
        .add_row(vec!["Funding PnL".to_string(), format!("{:.2}", view.funding_pnl)])
        .add_row(vec!["Trades".to_string(), view.trade_count.to_string()])
        .add_row(vec!["Turnover".to_string(), format!("{:.2}", view.turnover)])
        .add_row(vec!["Anomalies".to_string(), view.anomaly_count.to_string()]);

    if let Some(model) = &view.model {
        table.add_row(vec!["AI model".to_string(), model.clone()]);
    }
    if let Some(version) = &view.schema_version {
        table.add_row(vec!["Schema".to_string(), version.clone()]);
    }
    table
}

pub fn coverage_table(report: &CoverageReport) -> Table {
    let window = match (report.start, report.end) {
        (Some(start), Some(end)) => format!("{} .. {}", start.date_naive(), end.date_naive()),
        _ => "-".to_string(),
    };
    let missing = report.missing_keys();

    let mut table = table(vec!["Coverage", "Value"]);
    table
        .add_row(vec!["Market data".to_string(), yes_no(report.has_market).to_string()])
        .add_row(vec!["Window".to_string(), window])
        .add_row(vec!["Symbols".to_string(), report.symbols.join(", ")])
        .add_row(vec![
            "Missing".to_string(),
            if missing.is_empty() {
                "-".to_string()
            } else {
                missing.join(", ")
            },
        ]);
    for note in &report.notes {
        table.add_row(vec!["Note".to_string(), note.clone()]);
    }
    table
}

pub fn accounts_table(accounts: &[Account]) -> Table {
    let mut table = table(vec!["Id", "Exchange", "Label", "Types", "Enabled"]);
    for account in accounts {
        table.add_row(vec![
            account.id.clone(),
            account.exchange_id.clone(),
            account.label.clone(),
            account.account_types.join(", "),
            yes_no(account.is_enabled).to_string(),
        ]);
    }
    table
}

/// Progress of every running job, e.g. `report 40% · metrics`
pub fn progress_line(state: &ReportState) -> Option<String> {
    let parts: Vec<String> = [JobKind::Report, JobKind::Analysis]
        .into_iter()
        .filter_map(|kind| {
            let track = state.track(kind);
            if !track.running {
                return None;
            }
            Some(match track.progress_line() {
                Some(line) => format!("{kind} {line}"),
                None => format!("{kind} running"),
            })
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use report_core::{JobStatus, JobStatusSnapshot, PeriodSummary, ReportResult};

    #[test]
    fn test_report_table_uses_net_mode_label() {
        let report = ReportResult::new("r-1").with_period(PeriodSummary {
            trading_fees: 3.5,
            net_after_fees: 96.5,
            net_after_fees_and_funding: 90.25,
            ..PeriodSummary::default()
        });

        let fees_only = report_table(&ReportView::new(&report, NetMode::FeesOnly)).to_string();
        assert!(fees_only.contains("Net after fees"));
        assert!(fees_only.contains("96.50"));

        let with_funding =
            report_table(&ReportView::new(&report, NetMode::FeesPlusFunding)).to_string();
        assert!(with_funding.contains("Net after fees and funding"));
        assert!(with_funding.contains("90.25"));
    }

    #[test]
    fn test_coverage_table_lists_missing_keys() {
        let mut report = CoverageReport {
            symbols: vec!["BTCUSDT".to_string()],
            ..CoverageReport::default()
        };
        report
            .missing
            .insert("BTCUSDT:1h".to_string(), serde_json::Value::Null);

        let rendered = coverage_table(&report).to_string();
        assert!(rendered.contains("BTCUSDT:1h"));
        assert!(rendered.contains("no"));
    }

    #[test]
    fn test_progress_line_shows_running_jobs_only() {
        assert_eq!(progress_line(&ReportState::default()), None);

        let mut state = ReportState::default();
        state.report_job.running = true;
        state.report_job.snapshot = Some(
            JobStatusSnapshot::new(JobStatus::Running)
                .with_stage("metrics")
                .with_percent(40),
        );
        state.analysis_job.running = true;

        assert_eq!(
            progress_line(&state).as_deref(),
            Some("report 40% · metrics | analysis running")
        );
    }
}
