//! Opaque job handles

use report_core::JobKind;
use std::fmt;

/// Reference to a launched backend job.
///
/// Only [`JobLauncher`](crate::JobLauncher) creates handles, so every handle
/// names a job the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    id: String,
    kind: JobKind,
}

impl JobHandle {
    pub(crate) fn new(id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// Backend id of the job (the report id for both kinds)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
