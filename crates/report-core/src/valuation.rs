//! Net value selection for display

use crate::report::PeriodSummary;
use crate::request::NetMode;

/// Net value of a period under the given mode; `0.0` when there is no period.
pub fn net_value(period: Option<&PeriodSummary>, mode: NetMode) -> f64 {
    match (period, mode) {
        (None, _) => 0.0,
        (Some(period), NetMode::FeesOnly) => period.net_after_fees,
        (Some(period), NetMode::FeesPlusFunding) => period.net_after_fees_and_funding,
    }
}
