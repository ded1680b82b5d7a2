//! Job status snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of backend job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Cost/PnL report generation
    Report,
    /// AI narrative analysis of an existing report
    Analysis,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Report => f.write_str("report"),
            Self::Analysis => f.write_str("analysis"),
        }
    }
}

/// Lifecycle status reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    /// Any value the backend uses when it has no progress record
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// `completed` and `failed` end a job
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One observation of a job's progress.
///
/// Only `status` carries meaning for control flow; the other fields are
/// display data and `percent` may go backwards between snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusSnapshot {
    pub status: JobStatus,
    pub stage: String,
    pub percent: u8,
    pub message: String,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatusSnapshot {
    /// Create a snapshot with the given status, stamped now
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            stage: status.to_string(),
            percent: 0,
            message: String::new(),
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Set the stage label
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into();
        self
    }

    /// Set the progress percentage, clamped to `0..=100`
    pub fn with_percent(mut self, percent: i64) -> Self {
        self.percent = percent.clamp(0, 100) as u8;
        self
    }

    /// Set the human readable message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the error text
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Set the snapshot timestamp
    pub fn at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// One-line progress description, e.g. `40% · metrics · compute metrics`
    pub fn progress_line(&self) -> String {
        if self.message.is_empty() {
            format!("{}% · {}", self.percent, self.stage)
        } else {
            format!("{}% · {} · {}", self.percent, self.stage, self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_unrecognised_status_deserialises_as_unknown() {
        let status: JobStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(status, JobStatus::Unknown);
        let status: JobStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(status, JobStatus::Completed);
    }

    #[test]
    fn test_percent_is_clamped() {
        assert_eq!(JobStatusSnapshot::new(JobStatus::Running).with_percent(140).percent, 100);
        assert_eq!(JobStatusSnapshot::new(JobStatus::Running).with_percent(-3).percent, 0);
        assert_eq!(JobStatusSnapshot::new(JobStatus::Running).with_percent(42).percent, 42);
    }

    #[test]
    fn test_progress_line() {
        let snapshot = JobStatusSnapshot::new(JobStatus::Running)
            .with_stage("metrics")
            .with_percent(40)
            .with_message("compute metrics");
        assert_eq!(snapshot.progress_line(), "40% · metrics · compute metrics");

        let bare = JobStatusSnapshot::new(JobStatus::Queued).with_percent(1);
        assert_eq!(bare.progress_line(), "1% · queued");
    }
}
