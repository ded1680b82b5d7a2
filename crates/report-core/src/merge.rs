//! Shallow merging of partial results into existing state
//!
//! Every field present in a patch overwrites the previous value; every field
//! absent from the patch is carried over unchanged. Nothing is merged
//! recursively.

use crate::report::{AnalysisResult, ReportResult, ReportSummary};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Types that accept a partial update
pub trait Merge: Sized {
    /// Partial update type
    type Patch;

    /// Apply `patch` on top of `self`
    fn merge(self, patch: Self::Patch) -> Self;
}

impl Merge for Map<String, Value> {
    type Patch = Map<String, Value>;

    fn merge(mut self, patch: Self::Patch) -> Self {
        self.extend(patch);
        self
    }
}

/// Partial update of a [`ReportResult`].
///
/// `None` means "absent". For nullable report fields the inner `Option` is the
/// value to store, so `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPatch {
    pub summary: Option<ReportSummary>,
    pub anomalies: Option<Vec<Value>>,
    pub base_narrative: Option<String>,
    pub ai_narrative: Option<Option<String>>,
    pub chart_spec: Option<Option<String>>,
    pub schema_version: Option<Option<String>>,
    pub ai_model: Option<Option<String>>,
    pub ai_generated_at: Option<Option<DateTime<Utc>>>,
    pub ai_status: Option<Option<String>>,
    pub ai_error: Option<Option<String>>,
}

impl ReportPatch {
    /// Whether the patch carries no field at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<AnalysisResult> for ReportPatch {
    fn from(analysis: AnalysisResult) -> Self {
        Self {
            ai_narrative: Some(analysis.narrative.filter(|text| !text.is_empty())),
            ai_model: Some(analysis.model),
            ai_generated_at: Some(analysis.generated_at),
            ai_status: Some(analysis.status),
            ai_error: Some(analysis.error),
            ..Self::default()
        }
    }
}

fn overwrite<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl Merge for ReportResult {
    type Patch = ReportPatch;

    fn merge(mut self, patch: ReportPatch) -> Self {
        overwrite(&mut self.summary, patch.summary);
        overwrite(&mut self.anomalies, patch.anomalies);
        overwrite(&mut self.base_narrative, patch.base_narrative);
        overwrite(&mut self.ai_narrative, patch.ai_narrative);
        overwrite(&mut self.chart_spec, patch.chart_spec);
        overwrite(&mut self.schema_version, patch.schema_version);
        overwrite(&mut self.ai_model, patch.ai_model);
        overwrite(&mut self.ai_generated_at, patch.ai_generated_at);
        overwrite(&mut self.ai_status, patch.ai_status);
        overwrite(&mut self.ai_error, patch.ai_error);
        self
    }
}
