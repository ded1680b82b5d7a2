//! Pre-flight market-data coverage gate
//!
//! Before a report job is launched the backend is asked whether market data
//! covers the requested scope and window. The gate never fails: a missing or
//! failing check degrades the request to a fees-only report and produces a
//! warning for the user instead.

use crate::deadline::within;
use report_client::ReportBackend;
use report_core::{CoverageReport, JobRequest, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of the coverage gate
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageGate {
    /// The request with `include_market` decided by the check
    pub request: JobRequest,
    /// Degradation message, absent when market data is available
    pub warning: Option<String>,
    /// Check result, absent when the check failed
    pub report: Option<CoverageReport>,
}

impl CoverageGate {
    pub fn include_market(&self) -> bool {
        self.request.include_market
    }
}

/// Runs coverage checks against the backend
pub struct CoverageChecker {
    backend: Arc<dyn ReportBackend>,
    timeout: Duration,
}

impl CoverageChecker {
    pub fn new(backend: Arc<dyn ReportBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Raw check for the scope and window of `request`
    pub async fn check(&self, request: &JobRequest) -> Result<CoverageReport> {
        within(
            "check_market_coverage",
            self.timeout,
            self.backend.check_market_coverage(request),
        )
        .await
    }

    /// Decide `include_market` for `request`
    pub async fn gate(&self, mut request: JobRequest) -> CoverageGate {
        match self.check(&request).await {
            Ok(report) if report.has_market => {
                debug!("Market data available for {} symbols", report.symbols.len());
                request.include_market = true;
                CoverageGate {
                    request,
                    warning: None,
                    report: Some(report),
                }
            }
            Ok(report) => {
                let warning = missing_coverage_warning(&report);
                warn!("{}", warning);
                request.include_market = false;
                CoverageGate {
                    request,
                    warning: Some(warning),
                    report: Some(report),
                }
            }
            Err(err) => {
                let warning = format!("Coverage check failed, degraded to fees-only: {err}");
                warn!("{}", warning);
                request.include_market = false;
                CoverageGate {
                    request,
                    warning: Some(warning),
                    report: None,
                }
            }
        }
    }
}

fn missing_coverage_warning(report: &CoverageReport) -> String {
    let keys = report.missing_keys();
    if keys.is_empty() {
        "Market data is insufficient for the selected window; generating a fees-only report"
            .to_string()
    } else {
        format!(
            "Market data gaps: {}; generating a fees-only report",
            keys.join(", ")
        )
    }
}
