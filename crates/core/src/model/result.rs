use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::PartContent;

/// Qualitative feedback returned by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerFeedback {
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

/// Opaque scorer response, propagated into [`SessionResult`] unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerOutput {
    pub scores: BTreeMap<String, f64>,
    pub feedback: ScorerFeedback,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// Final outcome of a submitted session.
///
/// Produced exactly once, at submission, and handed to the caller as a
/// read-only value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    per_part_artifacts: Vec<PartContent>,
    total_elapsed_seconds: u64,
    scorer_output: ScorerOutput,
}

impl SessionResult {
    #[must_use]
    pub fn new(
        per_part_artifacts: Vec<PartContent>,
        total_elapsed_seconds: u64,
        scorer_output: ScorerOutput,
    ) -> Self {
        Self {
            per_part_artifacts,
            total_elapsed_seconds,
            scorer_output,
        }
    }

    /// Final content of every part, in part order.
    #[must_use]
    pub fn per_part_artifacts(&self) -> &[PartContent] {
        &self.per_part_artifacts
    }

    #[must_use]
    pub fn total_elapsed_seconds(&self) -> u64 {
        self.total_elapsed_seconds
    }

    #[must_use]
    pub fn scorer_output(&self) -> &ScorerOutput {
        &self.scorer_output
    }
}
