//! Core types for report job orchestration
//!
//! This crate defines the data model shared by the client and job layers:
//! job requests, status snapshots, report and analysis results, coverage
//! checks, the error taxonomy, and the pure helpers used for display
//! (net value selection, narrative sanitizing, shallow result merging).

pub mod account;
pub mod coverage;
pub mod error;
pub mod merge;
pub mod report;
pub mod request;
pub mod sanitize;
pub mod status;
pub mod timestamp;
pub mod valuation;
pub mod view;

pub use account::Account;
pub use coverage::CoverageReport;
pub use error::{Error, Result};
pub use merge::{Merge, ReportPatch};
pub use report::{AnalysisResult, PeriodSummary, ReportResult, ReportSummary};
pub use request::{AccountScope, JobRequest, NetMode, Preset, TimeWindow};
pub use sanitize::sanitize;
pub use status::{JobKind, JobStatus, JobStatusSnapshot};
pub use valuation::net_value;
pub use view::ReportView;
