//! Job request types
//!
//! A [`JobRequest`] describes which accounts, which time window and which net
//! formula a report job should use. The window is either a named preset or an
//! explicit date range; the enum makes the two mutually exclusive.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which accounts a job covers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "ids")]
pub enum AccountScope {
    /// Every enabled account
    #[default]
    All,
    /// An explicit set of account ids
    Accounts(Vec<String>),
}

impl AccountScope {
    /// Account ids to send, `None` meaning "all"
    pub fn account_ids(&self) -> Option<&[String]> {
        match self {
            Self::All => None,
            Self::Accounts(ids) => Some(ids),
        }
    }
}

/// Named reporting windows understood by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Preset {
    #[serde(rename = "last_7d")]
    Last7d,
    #[default]
    #[serde(rename = "last_30d")]
    Last30d,
    #[serde(rename = "this_month")]
    ThisMonth,
    #[serde(rename = "last_month")]
    LastMonth,
    #[serde(rename = "ytd")]
    Ytd,
    #[serde(rename = "all_time")]
    AllTime,
}

impl Preset {
    /// All presets in display order
    pub const ALL: [Preset; 6] = [
        Preset::Last7d,
        Preset::Last30d,
        Preset::ThisMonth,
        Preset::LastMonth,
        Preset::Ytd,
        Preset::AllTime,
    ];

    /// Wire name of the preset
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Last7d => "last_7d",
            Self::Last30d => "last_30d",
            Self::ThisMonth => "this_month",
            Self::LastMonth => "last_month",
            Self::Ytd => "ytd",
            Self::AllTime => "all_time",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str() == s.trim())
            .ok_or_else(|| Error::Validation(format!("unknown preset '{s}'")))
    }
}

/// Reporting time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    /// A named preset resolved by the backend
    Preset(Preset),
    /// An explicit, inclusive date range
    Range {
        /// First day of the window
        start: NaiveDate,
        /// Last day of the window
        end: NaiveDate,
    },
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::Preset(Preset::default())
    }
}

/// Which net formula is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetMode {
    /// Net after trading fees
    #[default]
    FeesOnly,
    /// Net after trading fees and funding
    FeesPlusFunding,
}

impl NetMode {
    /// Wire name of the mode
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FeesOnly => "fees_only",
            Self::FeesPlusFunding => "fees_plus_funding",
        }
    }
}

impl fmt::Display for NetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "fees_only" => Ok(Self::FeesOnly),
            "fees_plus_funding" => Ok(Self::FeesPlusFunding),
            other => Err(Error::Validation(format!("unknown net mode '{other}'"))),
        }
    }
}

/// Parameters of a report job
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobRequest {
    /// Accounts covered by the report
    pub scope: AccountScope,
    /// Optional exchange filter applied on top of the scope
    pub exchange_id: Option<String>,
    /// Time window
    pub window: TimeWindow,
    /// Net formula
    pub net_mode: NetMode,
    /// Whether market-derived metrics are requested.
    ///
    /// Left `false` unless a coverage check confirmed market data exists.
    pub include_market: bool,
}

impl JobRequest {
    /// Create a request for all accounts over the given window
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    /// Create a request over a named preset
    pub fn preset(preset: Preset) -> Self {
        Self::new(TimeWindow::Preset(preset))
    }

    /// Create a request over an explicit date range
    pub fn range(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(TimeWindow::Range { start, end })
    }

    /// Restrict the request to the given accounts
    pub fn with_accounts<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = AccountScope::Accounts(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict the request to one exchange
    pub fn with_exchange(mut self, exchange_id: impl Into<String>) -> Self {
        self.exchange_id = Some(exchange_id.into());
        self
    }

    /// Set the net formula
    pub fn with_net_mode(mut self, net_mode: NetMode) -> Self {
        self.net_mode = net_mode;
        self
    }

    /// Set the market flag
    pub fn with_market(mut self, include_market: bool) -> Self {
        self.include_market = include_market;
        self
    }

    /// Check the request is well formed
    pub fn validate(&self) -> Result<()> {
        if let AccountScope::Accounts(ids) = &self.scope {
            if ids.is_empty() {
                return Err(Error::Validation(
                    "account scope must name at least one account".to_string(),
                ));
            }
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(Error::Validation("account id must not be blank".to_string()));
            }
        }

        if self
            .exchange_id
            .as_deref()
            .is_some_and(|exchange| exchange.trim().is_empty())
        {
            return Err(Error::Validation("exchange id must not be blank".to_string()));
        }

        if let TimeWindow::Range { start, end } = self.window {
            if start > end {
                return Err(Error::Validation(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_request() {
        let request = JobRequest::default();
        assert_eq!(request.scope, AccountScope::All);
        assert_eq!(request.window, TimeWindow::Preset(Preset::Last30d));
        assert_eq!(request.net_mode, NetMode::FeesOnly);
        assert!(!request.include_market);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let request = JobRequest::range(date(2024, 1, 1), date(2024, 1, 31))
            .with_accounts(["acc-1", "acc-2"])
            .with_exchange("bybit")
            .with_net_mode(NetMode::FeesPlusFunding);

        assert_eq!(
            request.scope.account_ids(),
            Some(&["acc-1".to_string(), "acc-2".to_string()][..])
        );
        assert_eq!(request.exchange_id.as_deref(), Some("bybit"));
        assert_eq!(request.net_mode, NetMode::FeesPlusFunding);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_inverted_range() {
        let request = JobRequest::range(date(2024, 2, 1), date(2024, 1, 1));
        let err = request.validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("after end date"));
    }

    #[test]
    fn test_validation_rejects_empty_scope() {
        let request = JobRequest::preset(Preset::Ytd).with_accounts(Vec::<String>::new());
        assert!(matches!(request.validate(), Err(Error::Validation(_))));

        let request = JobRequest::preset(Preset::Ytd).with_accounts(["  "]);
        assert!(matches!(request.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_blank_exchange() {
        let request = JobRequest::preset(Preset::Ytd).with_exchange("");
        assert!(matches!(request.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_single_day_range_is_valid() {
        let request = JobRequest::range(date(2024, 3, 5), date(2024, 3, 5));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("last_7d".parse::<Preset>().unwrap(), Preset::Last7d);
        assert_eq!("all_time".parse::<Preset>().unwrap(), Preset::AllTime);
        assert!("last_year".parse::<Preset>().is_err());

        for preset in Preset::ALL {
            assert_eq!(preset.as_str().parse::<Preset>().unwrap(), preset);
        }
    }

    #[test]
    fn test_preset_serde_uses_wire_names() {
        let json = serde_json::to_string(&Preset::Last7d).unwrap();
        assert_eq!(json, "\"last_7d\"");
        let back: Preset = serde_json::from_str("\"this_month\"").unwrap();
        assert_eq!(back, Preset::ThisMonth);
    }

    #[test]
    fn test_net_mode_parsing() {
        assert_eq!("fees_only".parse::<NetMode>().unwrap(), NetMode::FeesOnly);
        assert_eq!(
            "fees_plus_funding".parse::<NetMode>().unwrap(),
            NetMode::FeesPlusFunding
        );
        assert!("gross".parse::<NetMode>().is_err());
        assert_eq!(NetMode::FeesPlusFunding.to_string(), "fees_plus_funding");
    }
}
