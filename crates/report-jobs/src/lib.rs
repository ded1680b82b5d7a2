//! Job orchestration for report-rs
//!
//! This crate turns the request/response [`report_client::ReportBackend`]
//! into long-running jobs: it gates report requests on market coverage,
//! launches jobs, polls their status on a cancellable schedule and folds
//! every observation into a [`ReportState`] that presentation code can
//! subscribe to.

pub mod config;
pub mod coverage;
mod deadline;
pub mod handle;
pub mod launcher;
pub mod poller;
pub mod scheduler;
pub mod session;
pub mod state;

// Re-export for convenience
pub use config::{SessionConfig, SessionConfigBuilder};
pub use coverage::{CoverageChecker, CoverageGate};
pub use handle::JobHandle;
pub use launcher::{JobLauncher, Launched};
pub use poller::{
    AnalysisJobSource, JobCompletion, JobObserver, JobSource, PollFailure, PollTiming,
    PollerState, ReportJobSource, StatusPoller,
};
pub use scheduler::ScheduledTask;
pub use session::{CoverageMode, ReportSession};
pub use state::{JobTrack, ReportState};
